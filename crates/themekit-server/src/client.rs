//! Browser-side live-reload runtime and HTML injection.

/// Route serving the client runtime.
pub const CLIENT_PATH: &str = "/__themekit/client.js";

/// Websocket route the client connects to.
pub const WS_PATH: &str = "/__themekit/ws";

/// Script tag added to every HTML page.
#[must_use]
pub fn script_tag() -> String {
    format!(r#"<script src="{CLIENT_PATH}"></script>"#)
}

/// Insert the client script before the last `</body>`, or append it.
///
/// Pages that already reference the client are returned unchanged.
#[must_use]
pub fn inject_client_script(html: &str) -> String {
    if html.contains(CLIENT_PATH) {
        return html.to_string();
    }

    let tag = script_tag();
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

/// The runtime served at [`CLIENT_PATH`].
#[must_use]
pub fn client_runtime() -> String {
    CLIENT_RUNTIME.replace("__WS_PATH__", WS_PATH)
}

const CLIENT_RUNTIME: &str = r"
(function () {
  'use strict';

  var connected = false;

  function refreshStyles(paths) {
    var links = document.querySelectorAll('link[rel=stylesheet]');
    var stamp = Date.now();
    var swapped = 0;
    for (var i = 0; i < links.length; i++) {
      var link = links[i];
      var url = new URL(link.href, location.href);
      if (url.host !== location.host || paths.indexOf(url.pathname) === -1) {
        continue;
      }
      url.searchParams.set('themekit', stamp);
      link.href = url.toString();
      swapped++;
    }
    console.log('[themekit] refreshed ' + swapped + ' stylesheet(s)');
  }

  function handle(msg) {
    switch (msg.type) {
      case 'connected':
        console.log('[themekit] connected.');
        break;
      case 'reload':
        location.reload();
        break;
      case 'css':
        refreshStyles(msg.paths || []);
        break;
    }
  }

  function connect() {
    var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
    var ws = new WebSocket(scheme + location.host + '__WS_PATH__');

    ws.onopen = function () {
      connected = true;
    };

    ws.onmessage = function (event) {
      handle(JSON.parse(event.data));
    };

    ws.onclose = function () {
      if (connected) {
        console.log('[themekit] server connection lost, retrying...');
        connected = false;
      }
      setTimeout(connect, 1000);
    };
  }

  connect();
})();
";
