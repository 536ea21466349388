#![forbid(unsafe_code)]

//! Start parameters delivered to a surface.

use std::fmt;

use tracing::{error, info};
use url::Url;

use crate::error::StartParamsError;

/// Uri identifying one surface instance.
///
/// Keeps the string it was parsed from: intents address a surface by that
/// exact string, and the parsed form may be normalized (`https://host`
/// becomes `https://host/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri {
    raw: String,
    parsed: Url,
}

impl ContentUri {
    pub fn parse(uri: &str) -> Result<Self, StartParamsError> {
        let parsed = Url::parse(uri).map_err(|source| StartParamsError::invalid_uri(uri, source))?;
        Ok(Self {
            raw: uri.to_string(),
            parsed,
        })
    }

    /// Instance id derived from the uri: its path.
    pub fn instance_id(&self) -> &str {
        self.parsed.path()
    }

    /// The uri exactly as received.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Normalized form.
    pub fn url(&self) -> &Url {
        &self.parsed
    }

    /// Whether `other` names this uri, compared with the received string.
    pub fn matches(&self, other: Option<&str>) -> bool {
        other.is_some_and(|other| other == self.raw)
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Loosely typed launch extras, as received from whoever starts a surface.
#[derive(Debug, Clone)]
pub struct Bundle<C> {
    pub uri: Option<String>,
    pub contents: Option<C>,
    pub remote_control: bool,
    pub touch_input: bool,
}

impl<C> Default for Bundle<C> {
    fn default() -> Self {
        Self {
            uri: None,
            contents: None,
            remote_control: false,
            touch_input: false,
        }
    }
}

/// Validated parameters for [`SurfaceHelper::on_new_start_params`].
///
/// [`SurfaceHelper::on_new_start_params`]: crate::SurfaceHelper::on_new_start_params
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartParams<C> {
    pub uri: ContentUri,
    pub contents: C,
    /// Remote-control surfaces never take audio focus.
    pub remote_control: bool,
    pub touch_input: bool,
}

impl<C> StartParams<C> {
    pub fn new(uri: ContentUri, contents: C, remote_control: bool, touch_input: bool) -> Self {
        Self {
            uri,
            contents,
            remote_control,
            touch_input,
        }
    }

    /// Validate launch extras.
    pub fn from_bundle(bundle: Bundle<C>) -> Result<Self, StartParamsError> {
        let Some(raw) = bundle.uri else {
            info!("start params without uri received");
            return Err(StartParamsError::MissingUri);
        };
        let uri = ContentUri::parse(&raw).inspect_err(|_| {
            info!(uri = %raw, "invalid uri string");
        })?;
        let Some(contents) = bundle.contents else {
            error!(%uri, "received start params without contents");
            return Err(StartParamsError::MissingContents);
        };
        Ok(Self::new(
            uri,
            contents,
            bundle.remote_control,
            bundle.touch_input,
        ))
    }
}
