//! In-process surface driven by the host plugin runtime.
//!
//! The host calls [`Provider::configure`] once per session, then instantiates
//! every resource type returned by [`Provider::resources`], hands each the
//! provider data produced by `configure`, and drives the lifecycle callbacks.
//! State snapshots travel as [`Object`]s; a `None` state means the resource is
//! absent.

mod diagnostics;
mod schema;
mod value;

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use schema::{Attribute, AttributeType, Schema};
pub use value::{
    get_bool, get_string, get_string_map, object_from_json, AttrValue, AttributePath, Object,
    PathStep, Value,
};

/// Opaque data a provider shares with its resources after configuration
pub type ProviderData = Arc<dyn Any + Send + Sync>;

/// Constructor for a resource type
pub type ResourceFactory = fn() -> Box<dyn Resource>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// Prefix of every resource type name served by the provider
    pub type_name: String,
    pub version: String,
}

#[derive(Default)]
pub struct ConfigureResponse {
    pub diagnostics: Diagnostics,
    /// Handed to every resource's `configure`; unset when configuration failed
    pub provider_data: Option<ProviderData>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn metadata(&self) -> ProviderMetadata;

    fn schema(&self) -> Schema;

    async fn configure(&self, ctx: &Context, config: &Object) -> ConfigureResponse;

    fn resources(&self) -> Vec<ResourceFactory>;
}

pub struct CreateRequest {
    pub plan: Object,
}

#[derive(Debug, Default)]
pub struct CreateResponse {
    /// `None` leaves the resource absent
    pub state: Option<Object>,
    pub diagnostics: Diagnostics,
}

pub struct ReadRequest {
    pub state: Option<Object>,
}

#[derive(Debug, Default)]
pub struct ReadResponse {
    /// `None` removes the resource from state so the host plans recreation
    pub state: Option<Object>,
    pub diagnostics: Diagnostics,
}

pub struct UpdateRequest {
    pub plan: Object,
    pub prior_state: Object,
}

#[derive(Debug, Default)]
pub struct UpdateResponse {
    pub state: Option<Object>,
    pub diagnostics: Diagnostics,
}

pub struct DeleteRequest {
    pub prior_state: Object,
}

#[derive(Debug, Default)]
pub struct DeleteResponse {
    pub state: Option<Object>,
    pub diagnostics: Diagnostics,
}

/// Lifecycle of a single managed resource type
///
/// Callbacks for one resource instance never overlap; callbacks for different
/// instances may run concurrently.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Full type name, derived from the provider type name
    fn metadata(&self, provider_type_name: &str) -> String;

    fn schema(&self) -> Schema;

    /// Receive the provider data. Called with `None` before the provider has
    /// been configured.
    fn configure(&mut self, provider_data: Option<ProviderData>) -> Diagnostics;

    async fn create(&self, ctx: &Context, req: CreateRequest) -> CreateResponse;

    async fn read(&self, ctx: &Context, req: ReadRequest) -> ReadResponse;

    async fn update(&self, ctx: &Context, req: UpdateRequest) -> UpdateResponse;

    async fn delete(&self, ctx: &Context, req: DeleteRequest) -> DeleteResponse;
}
