use crate::app::{SCRIPT_PATH, STYLESHEET_PATH};
use crate::models::ClientConfig;

pub const CONFIG_GLOBAL: &str = "pluginES6WPREST";

/// The embeddable counter: output element plus a button carrying the same value.
pub fn render_fragment(sum: i64) -> String {
    format!(
        concat!(
            r#"<div id="es6-demo">"#,
            r#"<div id="es6-demo-output">{sum}</div>"#,
            r#"<form><input id="es6-demo-input" type="button" value="+" data-sum="{sum}"></form>"#,
            r#"</div>"#
        ),
        sum = sum
    )
}

/// Inline script assigning the client configuration to a page-level constant.
pub fn render_config_script(config: &ClientConfig) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(config)?.replace("</", "<\\/");
    Ok(format!("const {CONFIG_GLOBAL} = {json};"))
}

pub fn render_page(config: &ClientConfig, sum: i64) -> Result<String, serde_json::Error> {
    Ok(INDEX_HTML
        .replace("{{STYLESHEET}}", STYLESHEET_PATH)
        .replace("{{SCRIPT}}", SCRIPT_PATH)
        .replace("{{CONFIG}}", &render_config_script(config)?)
        .replace("{{FRAGMENT}}", &render_fragment(sum)))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>ES6 REST Demo</title>
  <link rel="stylesheet" href="{{STYLESHEET}}" />
</head>
<body>
  <main>
    {{FRAGMENT}}
  </main>
  <script>{{CONFIG}}</script>
  <script src="{{SCRIPT}}"></script>
</body>
</html>
"#;

pub const STYLESHEET: &str = r#"#es6-demo {
  display: inline-flex;
  align-items: center;
  gap: 12px;
  font-family: "Trebuchet MS", sans-serif;
}

#es6-demo-output {
  min-width: 3ch;
  font-size: 2rem;
  font-weight: 600;
  text-align: right;
}

#es6-demo form {
  margin: 0;
}

#es6-demo-input {
  width: 44px;
  height: 44px;
  border: none;
  border-radius: 50%;
  background: #2f4858;
  color: #fff;
  font-size: 1.5rem;
  cursor: pointer;
}

#es6-demo-input:active {
  transform: scale(0.95);
}
"#;

pub const CLIENT_SCRIPT: &str = r#"document.addEventListener('DOMContentLoaded', () => {
  const button = document.getElementById('es6-demo-input');
  const output = document.getElementById('es6-demo-output');
  if (!button || !output || typeof pluginES6WPREST === 'undefined') {
    return;
  }

  button.addEventListener('click', async (event) => {
    event.preventDefault();
    const trigger = event.currentTarget;
    const body = JSON.stringify({ sum: trigger.dataset.sum });

    try {
      const res = await fetch(pluginES6WPREST.restURL, {
        method: 'POST',
        credentials: 'same-origin',
        headers: {
          'X-WP-Nonce': pluginES6WPREST.nonce,
          'content-type': 'application/json'
        },
        body
      });
      const result = await res.json();
      if (result.response === 'success') {
        trigger.dataset.sum = result.data;
        output.textContent = result.data;
        console.log(result);
      } else {
        console.error(result);
      }
    } catch (err) {
      console.error(err);
    }
  });
});
"#;
