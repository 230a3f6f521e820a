use async_trait::async_trait;

use crate::notify::{ChannelError, NotificationMessage};
use crate::storage::OpContext;

/// One delivery medium. Implementations are cheap to construct and may
/// self-disable when their configuration is unusable; disabled channels
/// are skipped silently at dispatch time.
///
/// Every send takes an [`OpContext`] so the caller can impose a deadline;
/// expiry surfaces as [`ChannelError::Cancelled`].
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Stable identifier used in dispatch reports, e.g. "email".
    fn channel_type(&self) -> &'static str;

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(
        &self,
        message: &NotificationMessage,
        ctx: &OpContext,
    ) -> Result<(), ChannelError>;
}

/// Run a delivery under the context's deadline, mapping expiry to
/// `ChannelError::Cancelled` so a caller-imposed abort is distinguishable
/// from a failure reported by the delivery target.
pub(crate) async fn with_deadline<T, F>(ctx: &OpContext, fut: F) -> Result<T, ChannelError>
where
    F: std::future::Future<Output = Result<T, ChannelError>>,
{
    match ctx.remaining() {
        Err(_) => Err(ChannelError::Cancelled),
        Ok(None) => fut.await,
        Ok(Some(budget)) => match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Cancelled),
        },
    }
}
