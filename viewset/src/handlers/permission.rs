//! Default permission policy

use async_trait::async_trait;

use super::traits::{BoxError, PermissionChecker};
use crate::context::RequestContext;

/// Permits every action
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAny;

#[async_trait]
impl PermissionChecker for AllowAny {
    async fn check(&self, _action: &str, _ctx: &RequestContext) -> Result<(), BoxError> {
        Ok(())
    }
}
