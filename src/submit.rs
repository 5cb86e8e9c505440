use crate::payload::{FormField, EXPORT_CONTENT_TYPE};
use gloo_net::http::Request;
use gloo_timers::callback::Timeout;
use log::info;
use regex::{Regex, RegexBuilder};
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url, UrlSearchParams};

const DOWNLOAD_CLEANUP_MS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Please wait for the advisor list to load.")]
    NotReady,
    #[error("Your rankings are still being submitted.")]
    Busy,
    #[error("Please enter your full name.")]
    MissingName,
    #[error("Please enter your email address.")]
    MissingEmail,
    #[error("Use your @{0} email address.")]
    InvalidEmail(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {0}")]
    Status(u16),
    #[error("browser error: {0}")]
    Browser(String),
}

impl SubmitError {
    fn browser(err: JsValue) -> Self {
        Self::Browser(format!("{:?}", err))
    }
}

/// Accepts only addresses at one domain, case-insensitively.
#[derive(Debug, Clone)]
pub struct EmailRule {
    domain: String,
    pattern: Regex,
}

impl EmailRule {
    pub fn for_domain(domain: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&format!(r"^[^\s@]+@{}$", regex::escape(domain)))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            domain: domain.to_owned(),
            pattern,
        })
    }

    pub fn check(&self, email: &str) -> Result<(), SubmitError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(SubmitError::MissingEmail);
        }
        if self.pattern.is_match(email) {
            Ok(())
        } else {
            Err(SubmitError::InvalidEmail(self.domain.clone()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Loading,
    Ready,
    LoadFailed,
    Submitting,
}

/// Decides whether the submit control is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitGate {
    state: GateState,
}

impl Default for SubmitGate {
    fn default() -> Self {
        Self {
            state: GateState::Loading,
        }
    }
}

impl SubmitGate {
    #[cfg(test)]
    fn state(&self) -> GateState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == GateState::Ready
    }

    /// Settles a load attempt. Returns false if the attempt was already settled.
    pub fn load_finished(&mut self, succeeded: bool) -> bool {
        if self.state != GateState::Loading {
            return false;
        }
        self.state = if succeeded {
            GateState::Ready
        } else {
            GateState::LoadFailed
        };
        true
    }

    /// Why a submission cannot start right now, if it cannot.
    pub fn check_ready(&self) -> Result<(), SubmitError> {
        match self.state {
            GateState::Ready => Ok(()),
            GateState::Submitting => Err(SubmitError::Busy),
            GateState::Loading | GateState::LoadFailed => Err(SubmitError::NotReady),
        }
    }

    pub fn begin_submit(&mut self) -> Result<(), SubmitError> {
        self.check_ready()?;
        self.state = GateState::Submitting;
        Ok(())
    }

    pub fn finish_submit(&mut self) {
        if self.state == GateState::Submitting {
            self.state = GateState::Ready;
        }
    }
}

pub async fn post_form(endpoint: &str, fields: &[FormField]) -> Result<(), SubmitError> {
    let params = UrlSearchParams::new().map_err(SubmitError::browser)?;
    for field in fields {
        params.append(&field.name, &field.value);
    }

    let response = Request::post(endpoint)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(params)
        .send()
        .await
        .map_err(|err| SubmitError::Network(err.to_string()))?;

    if !response.ok() {
        return Err(SubmitError::Status(response.status()));
    }

    info!("Submitted {} form fields to {}", fields.len(), endpoint);
    Ok(())
}

pub fn download_csv(csv: &str, file_name: &str) -> Result<(), SubmitError> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| SubmitError::Browser("no document".to_owned()))?;
    let body = document
        .body()
        .ok_or_else(|| SubmitError::Browser("no document body".to_owned()))?;

    let parts = js_sys::Array::of1(&JsValue::from_str(csv));
    let mut options = BlobPropertyBag::new();
    options.type_(EXPORT_CONTENT_TYPE);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)
        .map_err(SubmitError::browser)?;
    let href = Url::create_object_url_with_blob(&blob).map_err(SubmitError::browser)?;

    let link = document
        .create_element("a")
        .map_err(SubmitError::browser)?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|_| SubmitError::Browser("anchor cast failed".to_owned()))?;
    link.set_download(file_name);
    link.set_href(&href);
    link.style()
        .set_property("display", "none")
        .map_err(SubmitError::browser)?;
    body.append_child(&link).map_err(SubmitError::browser)?;
    link.click();

    Timeout::new(DOWNLOAD_CLEANUP_MS, move || {
        let _ = Url::revoke_object_url(&href);
        link.remove();
    })
    .forget();

    Ok(())
}
