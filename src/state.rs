use crate::config::ReconcileSettings;
use crate::payments::StripeClient;
use crate::store::StoreClient;

/// Application state holding the outbound clients and settings handlers need.
///
/// Built once at startup and cloned into handlers and background tasks;
/// tests assemble their own with clients pointed at mock servers.
#[derive(Clone)]
pub struct AppState {
    pub stripe: StripeClient,
    pub store: StoreClient,
    /// Where the processor sends the customer after paying.
    pub checkout_success_url: String,
    /// Where the processor sends the customer if they abandon checkout.
    pub checkout_cancel_url: String,
    pub reconcile: ReconcileSettings,
}
