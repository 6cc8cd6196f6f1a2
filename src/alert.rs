//! Alert system for displaying success and error messages to users.
//!
//! Alerts are returned from htmx endpoints and swapped into the `#alert-container`
//! element that [crate::html::base] places at the bottom of every page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

/// A dismissable message shown at the bottom of the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Success { message: String, details: String },
    SuccessSimple { message: String },
    Error { message: String, details: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (container_style, message, details) = match self {
            Alert::Success { message, details } => (
                "border-green-300 bg-green-50 text-green-800 \
                dark:border-green-800 dark:bg-gray-800 dark:text-green-400",
                message,
                details,
            ),
            Alert::SuccessSimple { message } => (
                "border-green-300 bg-green-50 text-green-800 \
                dark:border-green-800 dark:bg-gray-800 dark:text-green-400",
                message,
                String::new(),
            ),
            Alert::Error { message, details } => (
                "border-red-300 bg-red-50 text-red-800 \
                dark:border-red-800 dark:bg-gray-800 dark:text-red-400",
                message,
                details,
            ),
        };

        // Swapped out-of-band so that the alert lands in the container regardless of the
        // element that made the request.
        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div
                    role="alert"
                    class={ "flex items-start gap-3 p-4 mb-4 border rounded-lg " (container_style) }
                {
                    div class="flex-1"
                    {
                        p class="font-semibold" { (message) }

                        @if !details.is_empty() {
                            p class="text-sm mt-1" { (details) }
                        }
                    }

                    button
                        type="button"
                        aria-label="Закрыть"
                        class="ms-auto font-bold"
                        onclick="this.closest('#alert-container').classList.add('hidden')"
                    {
                        "×"
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.into_html()).into_response()
    }
}
