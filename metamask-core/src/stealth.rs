//! Fingerprint masking injected into every page before its own scripts run.
//!
//! Some dApps refuse to talk to a browser that advertises automation. The
//! script hides `navigator.webdriver` and pins the navigator and WebGL fields
//! that fingerprinting scripts read.

use serde::{Deserialize, Serialize};

/// Values reported to page scripts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthProfile {
    pub languages: Vec<String>,
    pub vendor: String,
    pub platform: String,
    pub webgl_vendor: String,
    pub renderer: String,
    /// Report a 1px offsetHeight for the hairline probe element.
    pub fix_hairline: bool,
}

impl Default for StealthProfile {
    fn default() -> Self {
        Self {
            languages: vec!["en-US".to_string(), "en".to_string()],
            vendor: "Google Inc.".to_string(),
            platform: "Win32".to_string(),
            webgl_vendor: "Intel Inc.".to_string(),
            renderer: "Intel Iris OpenGL Engine".to_string(),
            fix_hairline: true,
        }
    }
}

impl StealthProfile {
    /// Script for `Page.addScriptToEvaluateOnNewDocument`.
    pub fn script(&self) -> String {
        // serde_json output is a valid JS literal, quotes escaped
        let lit = |s: &str| serde_json::Value::from(s).to_string();
        let languages = serde_json::Value::from(self.languages.clone()).to_string();

        let mut script = format!(
            r#"(() => {{
  const define = (obj, prop, value) =>
    Object.defineProperty(obj, prop, {{ get: () => value, configurable: true }});
  define(Navigator.prototype, 'webdriver', undefined);
  define(Navigator.prototype, 'languages', Object.freeze({languages}));
  define(Navigator.prototype, 'vendor', {vendor});
  define(Navigator.prototype, 'platform', {platform});
  if (!window.chrome) {{ window.chrome = {{ runtime: {{}} }}; }}
  const patchGl = (proto) => {{
    if (!proto) return;
    const getParameter = proto.getParameter;
    proto.getParameter = function (param) {{
      if (param === 37445) return {webgl_vendor};
      if (param === 37446) return {renderer};
      return getParameter.call(this, param);
    }};
  }};
  patchGl(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
  patchGl(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);
"#,
            languages = languages,
            vendor = lit(&self.vendor),
            platform = lit(&self.platform),
            webgl_vendor = lit(&self.webgl_vendor),
            renderer = lit(&self.renderer),
        );

        if self.fix_hairline {
            script.push_str(
                r#"  const offsetHeight = Object.getOwnPropertyDescriptor(HTMLElement.prototype, 'offsetHeight');
  Object.defineProperty(HTMLDivElement.prototype, 'offsetHeight', {
    get() {
      if (this.id === 'modernizr') return 1;
      return offsetHeight.get.call(this);
    },
    configurable: true,
  });
"#,
            );
        }

        script.push_str("})();\n");
        script
    }
}
