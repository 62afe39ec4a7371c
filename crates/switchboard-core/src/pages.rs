//! Static markup served by both firmware programs.

/// Relay-lights dashboard. Builds one button per light from `/status`.
pub const RELAY_DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Lights</title>
<style>
body { font-family: sans-serif; background: #1e1e24; color: #eee; margin: 0; text-align: center; }
header { padding: 16px; background: #2b2b35; }
header a { color: #9ab; font-size: .9em; }
#lights { display: flex; flex-wrap: wrap; justify-content: center; gap: 12px; padding: 20px; }
.light { width: 130px; padding: 18px 0; border: 0; border-radius: 10px; font-size: 1em;
         background: #3a3a46; color: #eee; cursor: pointer; text-transform: capitalize; }
.light.on { background: #f5c542; color: #222; }
</style>
</head>
<body>
<header><h2>Lights</h2><a href="/settings">Wi-Fi settings</a></header>
<div id="lights"></div>
<script>
function render(status) {
  const box = document.getElementById('lights');
  box.innerHTML = '';
  for (const [name, on] of Object.entries(status)) {
    const b = document.createElement('button');
    b.className = 'light' + (on ? ' on' : '');
    b.textContent = name + (on ? ' ON' : ' OFF');
    b.onclick = () => fetch('/toggle?id=' + encodeURIComponent(name)).then(r => r.json()).then(render);
    box.appendChild(b);
  }
}
function refresh() { fetch('/status').then(r => r.json()).then(render); }
refresh();
setInterval(refresh, 3000);
</script>
</body>
</html>
"#;

/// Network settings: scan, pick a network, save credentials.
pub const RELAY_SETTINGS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Wi-Fi settings</title>
<style>
body { font-family: sans-serif; background: #1e1e24; color: #eee; margin: 0; }
main { max-width: 360px; margin: 24px auto; padding: 0 16px; }
label { display: block; margin-top: 12px; font-size: .9em; }
input, select, button { width: 100%; box-sizing: border-box; padding: 8px; margin-top: 4px; }
button { background: #4a7bd0; color: #fff; border: 0; border-radius: 6px; cursor: pointer; }
#result, #state { margin-top: 16px; font-size: .9em; }
a { color: #9ab; }
</style>
</head>
<body>
<main>
<h2>Wi-Fi settings</h2>
<div id="state"></div>
<button type="button" onclick="scan()">Scan networks</button>
<select id="networks" onchange="document.getElementById('ssid').value = this.value"></select>
<form id="wifi" onsubmit="save(event)">
  <label>Network<input id="ssid" name="ssid" required></label>
  <label>Password<input id="pass" name="pass" type="password" required></label>
  <label>Device name (optional)<input id="name" name="name" placeholder="esp32-lights"></label>
  <button type="submit">Save and connect</button>
</form>
<div id="result"></div>
<p><a href="/">Back to lights</a></p>
</main>
<script>
function scan() {
  const sel = document.getElementById('networks');
  sel.innerHTML = '<option>Scanning...</option>';
  fetch('/scan').then(r => r.json()).then(list => {
    sel.innerHTML = list.length ? '' : '<option>No networks found</option>';
    for (const ssid of list) {
      const o = document.createElement('option');
      o.value = o.textContent = ssid;
      sel.appendChild(o);
    }
  });
}
function save(e) {
  e.preventDefault();
  document.getElementById('result').textContent = 'Connecting, this can take up to 12 seconds...';
  fetch('/savewifi', { method: 'POST', body: new URLSearchParams(new FormData(e.target)) })
    .then(r => r.text())
    .then(t => { document.getElementById('result').innerHTML = t; state(); });
}
function state() {
  fetch('/network').then(r => r.json()).then(s => {
    document.getElementById('state').textContent =
      (s.connected ? 'Connected as ' + s.deviceName + ' (' + s.stationIp + ')' : 'Not connected') +
      ', access point ' + s.accessPointIp;
  });
}
state();
</script>
</body>
</html>
"#;

/// Climate dashboard: temperature, humidity and the LED button.
pub const CLIMATE_DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Climate</title>
<style>
body { font-family: sans-serif; background: #eef1f5; margin: 0; text-align: center; }
h1 { margin: 0; padding: 18px; background: #2f6fdb; color: #fff; }
.card { background: #fff; border-radius: 10px; padding: 18px; margin: 18px auto; width: 280px;
        box-shadow: 0 3px 8px rgba(0,0,0,.15); }
.value { font-size: 2em; color: #2f6fdb; }
button { background: #2f6fdb; color: #fff; border: 0; padding: 10px 20px; border-radius: 6px; cursor: pointer; }
</style>
</head>
<body>
<h1>Climate</h1>
<div class="card"><div>Temperature</div><div id="temp" class="value">-- &deg;C</div></div>
<div class="card"><div>Humidity</div><div id="hum" class="value">-- %</div></div>
<div class="card">
  <button onclick="toggleLed()">Toggle LED</button>
  <div id="led" style="margin-top:10px">LED is OFF</div>
</div>
<script>
function poll() {
  fetch('/sensor').then(r => r.json()).then(d => {
    document.getElementById('temp').textContent = d.temperature.toFixed(1) + ' °C';
    document.getElementById('hum').textContent = d.humidity.toFixed(1) + ' %';
  });
}
function toggleLed() {
  fetch('/toggleLED').then(r => r.text()).then(s => {
    document.getElementById('led').textContent = 'LED is ' + s;
  });
}
poll();
setInterval(poll, 2000);
</script>
</body>
</html>
"#;

/// Escape text for interpolation into HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
