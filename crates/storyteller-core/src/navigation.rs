//! Navigation surface between pages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three pages of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    /// Animated landing page.
    Welcome,
    /// Story style picker.
    StyleChoose,
    /// Voice chat page.
    Chat,
}

impl Route {
    /// Returns the route path.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Welcome => "/welcome",
            Self::StyleChoose => "/style-choose",
            Self::Chat => "/chat",
        }
    }

    /// Resolves a path to a route. The root path redirects to the landing page.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" | "/welcome" => Some(Self::Welcome),
            "/style-choose" => Some(Self::StyleChoose),
            "/chat" => Some(Self::Chat),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A navigation request carrying an optional opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Destination page.
    pub route: Route,
    /// Opaque payload handed to the destination (e.g. a story style label).
    pub payload: Option<String>,
}

/// Performs page-to-page navigation.
pub trait Navigator: Send + Sync {
    /// Navigates to the requested page.
    fn navigate(&self, navigation: Navigation);
}
