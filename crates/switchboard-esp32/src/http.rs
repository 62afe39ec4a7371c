//! Route registration on `EspHttpServer`.
//!
//! Handlers lock the shared device for the whole request, so requests are
//! served one at a time just as on a single-threaded responder.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use embedded_svc::{
    http::{Headers, Method},
    io::{Read, Write},
};
use esp_idf_svc::http::server::{Configuration, EspHttpConnection, EspHttpServer, Request};
use serde::de::DeserializeOwned;
use switchboard_core::{
    respond, ClimateDevice, ClimateHandlers, RelayDevice, RelayHandlers, Reply, SaveWifiForm,
    ToggleQuery,
};

const MAX_FORM_BODY: usize = 512;

type HttpRequest<'r, 'c> = Request<&'r mut EspHttpConnection<'c>>;

fn write_reply(req: HttpRequest<'_, '_>, reply: Reply) -> Result<()> {
    req.into_response(reply.status, None, &[("Content-Type", reply.content_type)])?
        .write_all(reply.body.as_bytes())?;
    Ok(())
}

fn lock<T>(device: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    device.lock().map_err(|_| anyhow!("device state lock poisoned"))
}

/// Decode the query string of `uri` (empty when absent).
fn parse_query<T: DeserializeOwned>(uri: &str) -> Result<T> {
    let query = uri.split_once('?').map_or("", |(_, q)| q);
    Ok(serde_urlencoded::from_str(query)?)
}

/// Read and decode an `application/x-www-form-urlencoded` body.
fn parse_form<T: DeserializeOwned>(req: &mut HttpRequest<'_, '_>) -> Result<T> {
    let len = req.content_len().unwrap_or(0) as usize;
    if len > MAX_FORM_BODY {
        return Err(anyhow!("form body too large ({len} bytes)"));
    }

    let mut body = vec![0_u8; len];
    if len > 0 {
        req.read_exact(&mut body)?;
    }
    Ok(serde_urlencoded::from_bytes(&body)?)
}

fn server_config(http_port: u16) -> Configuration {
    Configuration {
        http_port,
        // `/savewifi` holds the request for the whole join budget.
        stack_size: 16 * 1024,
        ..Default::default()
    }
}

/// Serve the relay-lights endpoints. Keep the returned server alive.
pub fn start_relay_server(
    device: Arc<Mutex<RelayDevice>>,
    http_port: u16,
) -> Result<EspHttpServer<'static>> {
    let mut server = EspHttpServer::new(&server_config(http_port))?;

    server.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| {
        write_reply(req, RelayHandlers::dashboard())
    })?;

    server.fn_handler::<anyhow::Error, _>("/settings", Method::Get, |req| {
        write_reply(req, RelayHandlers::settings())
    })?;

    {
        let device = device.clone();
        server.fn_handler::<anyhow::Error, _>("/status", Method::Get, move |req| {
            let reply = respond(RelayHandlers::status(&*lock(&device)?));
            write_reply(req, reply)
        })?;
    }

    {
        let device = device.clone();
        server.fn_handler::<anyhow::Error, _>("/toggle", Method::Get, move |req| {
            let reply = match parse_query::<ToggleQuery>(req.uri()) {
                Ok(query) => respond(RelayHandlers::toggle(&mut *lock(&device)?, &query)),
                Err(e) => Reply {
                    status: 400,
                    ..Reply::text(e.to_string())
                },
            };
            write_reply(req, reply)
        })?;
    }

    {
        let device = device.clone();
        server.fn_handler::<anyhow::Error, _>("/scan", Method::Get, move |req| {
            let reply = respond(RelayHandlers::scan(&mut *lock(&device)?));
            write_reply(req, reply)
        })?;
    }

    {
        let device = device.clone();
        server.fn_handler::<anyhow::Error, _>("/savewifi", Method::Post, move |mut req| {
            let reply = match parse_form::<SaveWifiForm>(&mut req) {
                Ok(form) => respond(RelayHandlers::save_wifi(&mut *lock(&device)?, &form)),
                Err(e) => Reply {
                    status: 400,
                    ..Reply::text(e.to_string())
                },
            };
            write_reply(req, reply)
        })?;
    }

    server.fn_handler::<anyhow::Error, _>("/network", Method::Get, move |req| {
        let reply = respond(RelayHandlers::network(&*lock(&device)?));
        write_reply(req, reply)
    })?;

    log::info!("relay lights HTTP server listening on port {http_port}");
    Ok(server)
}

/// Serve the climate-dashboard endpoints. Keep the returned server alive.
pub fn start_climate_server(
    device: Arc<Mutex<ClimateDevice>>,
    http_port: u16,
) -> Result<EspHttpServer<'static>> {
    let mut server = EspHttpServer::new(&server_config(http_port))?;

    server.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| {
        write_reply(req, ClimateHandlers::dashboard())
    })?;

    {
        let device = device.clone();
        server.fn_handler::<anyhow::Error, _>("/sensor", Method::Get, move |req| {
            let reply = respond(ClimateHandlers::sensor(&*lock(&device)?));
            write_reply(req, reply)
        })?;
    }

    server.fn_handler::<anyhow::Error, _>("/toggleLED", Method::Get, move |req| {
        let reply = respond(ClimateHandlers::toggle_led(&mut *lock(&device)?));
        write_reply(req, reply)
    })?;

    log::info!("climate dashboard HTTP server listening on port {http_port}");
    Ok(server)
}
