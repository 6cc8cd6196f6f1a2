//! Accounts, credentials and the cookie based sessions that guard the rest of the app.

mod account;
mod cookie;
mod email;
mod identity;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod register;
mod role;
mod session;
mod token;
mod user;

pub use account::{authenticate, register_account};
pub use cookie::{
    COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, get_token_from_cookies, invalidate_auth_cookie,
    set_auth_cookie,
};
pub use email::Email;
pub use identity::{IdentityProvider, ProviderSession, SQLiteIdentityProvider};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, admin_guard, admin_guard_hx, auth_guard, auth_guard_hx};
pub use password::{PasswordHash, ValidatedPassword};
pub use redirect::{build_log_in_redirect_url, normalize_redirect_url};
pub use register::{get_register_page, register_user};
pub use role::{
    ADMIN_ROLE_ID, Role, RoleId, USER_ROLE_ID, create_role_table, get_all_roles, get_role,
    get_user_role,
};
pub use session::{Session, get_current_user};
pub use token::Token;
pub use user::{
    User, UserID, UserSummary, create_user, create_user_table, email_exists, get_user_by_email,
    get_user_by_id, list_users, set_password_hash, set_user_role,
};
