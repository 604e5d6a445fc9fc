mod health;
mod snippets;
mod users;

pub use health::ping;
pub use snippets::{create_form, create_submit, home, view};
pub use users::{login_form, login_submit, logout, signup_form, signup_submit};

use crate::auth::AuthState;
use crate::render::PageContext;
use crate::session::Session;

/// Collect the pipeline state a page render needs. Taking the flash here
/// consumes it, which is what makes it one-shot.
fn page_context(auth: &AuthState, session: &Session) -> PageContext {
    PageContext {
        signed_in: auth.signed_in(),
        csrf_token: session.csrf_token(),
        flash: session.take_flash(),
    }
}
