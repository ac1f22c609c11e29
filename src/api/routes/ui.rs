use axum::response::{Html, Redirect};

const CHAT_PAGE: &str = include_str!("../../../assets/chat.html");

pub async fn root() -> Redirect {
    Redirect::temporary("/chat-ui")
}

pub async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}
