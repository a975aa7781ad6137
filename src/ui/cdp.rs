use crate::browser::session::evaluate_json;
use crate::error::{BrowserError, Result};
use crate::ui::{ControlHandle, ControlRef, ControlRegistry, Intent, Scope, SelectOption, Selectors, UiAccessor};
use headless_chrome::Tab;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

const FIND_CONTROLS_JS: &str = include_str!("find_controls.js");

const READ_OPTIONS_FN: &str =
    "(el) => Array.from(el.options || []).map((o) => ({ value: o.value, label: o.innerText || o.text || '' }))";
const READ_VALUE_FN: &str = "(el) => el.value";
const WRITE_VALUE_FN: &str = "(el, value) => { el.value = value; }";
const DISPATCH_CHANGE_FN: &str = "(el) => { el.dispatchEvent(new Event('change', { bubbles: true })); }";
const CLICK_FN: &str = "(el) => { el.click(); }";
const READ_LABEL_FN: &str = "(el) => el.innerText || el.textContent || ''";
const READ_ATTRIBUTE_FN: &str = "(el, name) => el.getAttribute(name)";
const READ_HREF_FN: &str = "(el) => el.href || el.getAttribute('href')";

/// One element reported back by `find_controls.js`
#[derive(Debug, Deserialize)]
struct FoundControl {
    id: u64,
    tag: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindResponse {
    scope_missing: bool,
    controls: Vec<FoundControl>,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    missing: bool,
    #[serde(default)]
    value: Value,
}

/// [`UiAccessor`] over a live Chrome tab
///
/// Lookups run `find_controls.js`, which stamps every match with a
/// `data-scrape-ref` attribute. Later operations address the element through
/// that attribute, so a ref survives re-renders of unrelated parts of the page.
pub struct CdpAccessor {
    tab: Arc<Tab>,
    selectors: Selectors,
    registry: ControlRegistry,
}

impl CdpAccessor {
    pub fn new(tab: Arc<Tab>, selectors: Selectors) -> Self {
        Self { tab, selectors, registry: ControlRegistry::new() }
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    fn find(&mut self, scope: Scope, intent: Intent, single: bool) -> Result<Vec<ControlRef>> {
        let scope_selector = match scope {
            Scope::Document => None,
            Scope::Within(control) => Some(self.registry.selector_for(control)?.to_string()),
        };

        let script = format!(
            "({})({}, {}, {})",
            FIND_CONTROLS_JS,
            to_js_literal(&scope_selector)?,
            to_js_literal(self.selectors.chain(intent))?,
            single
        );

        let response: FindResponse = evaluate_json(&self.tab, &script)?;

        if response.scope_missing {
            if let Scope::Within(control) = scope {
                return Err(BrowserError::ElementNotFound(self.registry.describe(control)));
            }
        }

        let refs = response
            .controls
            .into_iter()
            .map(|found| {
                let control = ControlRef(found.id);
                self.registry.register(control, ControlHandle::for_ref(control, found.tag).with_text(&found.text));
                control
            })
            .collect::<Vec<_>>();

        log::trace!("{} lookup {:?} matched {} control(s)", intent, scope, refs.len());
        Ok(refs)
    }

    /// Run `function(el, arg)` against a previously found control
    fn call_on(&self, control: ControlRef, function: &str, arg: Value) -> Result<Value> {
        let selector = self.registry.selector_for(control)?;

        let script = format!(
            "(function () {{ const el = document.querySelector({}); if (!el) {{ return JSON.stringify({{ missing: true }}); }} const value = ({})(el, {}); return JSON.stringify({{ missing: false, value: value === undefined ? null : value }}); }})()",
            to_js_literal(selector)?,
            function,
            arg
        );

        let response: CallResponse = evaluate_json(&self.tab, &script)?;
        if response.missing {
            return Err(BrowserError::ElementNotFound(self.registry.describe(control)));
        }

        Ok(response.value)
    }

    fn call_typed<T: DeserializeOwned>(&self, control: ControlRef, function: &str, arg: Value) -> Result<T> {
        let value = self.call_on(control, function, arg)?;
        serde_json::from_value(value).map_err(|e| {
            BrowserError::InvalidResponse(format!("Unexpected value from {}: {}", self.registry.describe(control), e))
        })
    }
}

/// Serialize a value as a JavaScript literal
fn to_js_literal<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| BrowserError::InvalidResponse(format!("Failed to encode argument: {}", e)))
}

impl UiAccessor for CdpAccessor {
    fn find_single(&mut self, scope: Scope, intent: Intent) -> Result<Option<ControlRef>> {
        Ok(self.find(scope, intent, true)?.into_iter().next())
    }

    fn find_all(&mut self, scope: Scope, intent: Intent) -> Result<Vec<ControlRef>> {
        self.find(scope, intent, false)
    }

    fn list_options(&mut self, control: ControlRef) -> Result<Vec<SelectOption>> {
        self.call_typed(control, READ_OPTIONS_FN, Value::Null)
    }

    fn selected_value(&mut self, control: ControlRef) -> Result<String> {
        self.call_typed::<Option<String>>(control, READ_VALUE_FN, Value::Null).map(Option::unwrap_or_default)
    }

    fn set_selected_value(&mut self, control: ControlRef, value: &str) -> Result<()> {
        self.call_on(control, WRITE_VALUE_FN, Value::String(value.to_string()))?;
        Ok(())
    }

    fn dispatch_change(&mut self, control: ControlRef) -> Result<()> {
        self.call_on(control, DISPATCH_CHANGE_FN, Value::Null)?;
        Ok(())
    }

    fn activate(&mut self, control: ControlRef) -> Result<()> {
        log::trace!("click {}", self.registry.describe(control));
        self.call_on(control, CLICK_FN, Value::Null)?;
        Ok(())
    }

    fn read_label(&mut self, control: ControlRef) -> Result<String> {
        self.call_typed::<Option<String>>(control, READ_LABEL_FN, Value::Null).map(Option::unwrap_or_default)
    }

    fn read_attribute(&mut self, control: ControlRef, name: &str) -> Result<Option<String>> {
        self.call_typed(control, READ_ATTRIBUTE_FN, Value::String(name.to_string()))
    }

    fn read_link_target(&mut self, control: ControlRef) -> Result<Option<String>> {
        let href: Option<String> = self.call_typed(control, READ_HREF_FN, Value::Null)?;
        Ok(href.filter(|h| !h.trim().is_empty()))
    }
}
