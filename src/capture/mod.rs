//! Screenshot significance and login gating
//!
//! Decides at each agent step whether the current browser state is worth
//! persisting, whether it is a login interstitial that needs a human, and
//! whether the page has loaded enough to be captured at all.

pub mod dispatcher;
pub mod login;
pub mod page;
pub mod readiness;
pub mod significance;

pub use dispatcher::{LoginState, RunSession, StepDispatcher, StepOutcome};
pub use login::{is_login_page, wait_for_login, LoginWaitOutcome, LoginWaiter};
pub use page::{BrowserHandle, ContentMetrics, ElementProbe, Page};
pub use significance::{PerceptualHash, StateChangeFilter};
