//! The shell shared by the pages of a signed-in user.

use maud::{Markup, html};

use crate::{
    auth::Session,
    html::{HeadElement, base},
    navigation::NavBar,
    profile::{ProfileState, load_display_name},
};

/// Wrap `content` in the navigation bar and the base page.
pub fn protected_base(
    title: &str,
    active_endpoint: &str,
    display_name: Option<&str>,
    head_elements: &[HeadElement],
    content: &Markup,
) -> Markup {
    let nav_bar = NavBar::new(active_endpoint, display_name).into_html();
    let content = html! {
        (nav_bar)
        main { (content) }
    };

    base(title, head_elements, &content)
}

/// Render a protected page, greeting the user by the name in their profile.
pub async fn protected_page(
    profile_state: &ProfileState,
    session: &Session,
    title: &str,
    active_endpoint: &str,
    head_elements: &[HeadElement],
    content: &Markup,
) -> Markup {
    let display_name = load_display_name(profile_state, session).await;

    protected_base(
        title,
        active_endpoint,
        display_name.as_deref(),
        head_elements,
        content,
    )
}
