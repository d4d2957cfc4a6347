//! Donor portal gateway: a thin axum service that fronts Salesforce (contacts, accounts,
//! opportunities, donation summaries) and Stripe payment intents for a browser portal, with one
//! single-flight OAuth session shared by every authenticated route.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod config;
pub mod crm;
pub mod error;
pub mod http;
pub mod link;
pub mod oauth;
pub mod obs;
pub mod password;
pub mod payment;
pub mod session;
pub mod signer;

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
// The binary owns the eyre report handler and the runtime.
use color_eyre as _;
use tokio as _;
#[cfg(test)] use {httpmock as _, tower as _};
