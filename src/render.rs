//! HTML rendering for pages and forms.
//!
//! Deliberately small: a shared layout plus one function per page. All
//! interpolated user data goes through [`escape`].

use axum::response::Html;

use crate::db::Snippet;
use crate::forms::Form;
use crate::session::CSRF_FIELD;

/// Values every page needs from the request pipeline.
pub struct PageContext {
    pub signed_in: bool,
    pub csrf_token: String,
    pub flash: Option<String>,
}

/// Escape text for interpolation into HTML.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn csrf_input(token: &str) -> String {
    format!(
        r#"<input type="hidden" name="{CSRF_FIELD}" value="{}">"#,
        escape(token)
    )
}

fn field_errors(form: &Form, field: &str) -> String {
    form.errors(field)
        .iter()
        .map(|e| format!(r#"<label class="error">{}</label>"#, escape(e)))
        .collect()
}

fn layout(title: &str, ctx: &PageContext, main: &str) -> Html<String> {
    let nav = if ctx.signed_in {
        format!(
            concat!(
                r#"<a href="/">Home</a> <a href="/snippet/create">New snippet</a>"#,
                r#"<form method="POST" action="/user/logout">{}<button>Logout</button></form>"#,
            ),
            csrf_input(&ctx.csrf_token)
        )
    } else {
        r#"<a href="/">Home</a> <a href="/user/signup">Signup</a> <a href="/user/login">Login</a>"#
            .to_string()
    };

    let flash = match ctx.flash.as_deref() {
        Some(message) => format!(r#"<div class="flash">{}</div>"#, escape(message)),
        None => String::new(),
    };

    Html(format!(
        concat!(
            "<!doctype html>\n",
            r#"<html lang="en"><head><meta charset="utf-8"><title>{title} - Snipbin</title>"#,
            r#"<link rel="stylesheet" href="/static/main.css"></head>"#,
            "<body><header><h1><a href=\"/\">Snipbin</a></h1></header>",
            "<nav>{nav}</nav>{flash}<main>{main}</main></body></html>\n",
        ),
        title = escape(title),
        nav = nav,
        flash = flash,
        main = main,
    ))
}

pub fn home_page(ctx: &PageContext, snippets: &[Snippet]) -> Html<String> {
    let main = if snippets.is_empty() {
        "<p>There's nothing to see here yet!</p>".to_string()
    } else {
        let rows: String = snippets
            .iter()
            .map(|s| {
                format!(
                    r#"<tr><td><a href="/snippet/{id}">{title}</a></td><td>{created}</td><td>#{id}</td></tr>"#,
                    id = s.id,
                    title = escape(&s.title),
                    created = escape(&s.created),
                )
            })
            .collect();
        format!(
            "<h2>Latest Snippets</h2><table><tr><th>Title</th><th>Created</th><th>ID</th></tr>{rows}</table>"
        )
    };
    layout("Home", ctx, &main)
}

pub fn snippet_page(ctx: &PageContext, snippet: &Snippet) -> Html<String> {
    let main = format!(
        concat!(
            r#"<article class="snippet"><header><h2>{title}</h2><span>#{id}</span></header>"#,
            "<pre><code>{content}</code></pre>",
            "<footer><time>Created: {created}</time> <time>Expires: {expires}</time></footer></article>",
        ),
        title = escape(&snippet.title),
        id = snippet.id,
        content = escape(&snippet.content),
        created = escape(&snippet.created),
        expires = escape(&snippet.expires),
    );
    layout(&snippet.title, ctx, &main)
}

pub fn create_form_page(ctx: &PageContext, form: &Form) -> Html<String> {
    let main = format!(
        concat!(
            r#"<form method="POST" action="/snippet/create">{csrf}"#,
            r#"<div><label>Title</label>{title_errors}<input type="text" name="title" value="{title}"></div>"#,
            r#"<div><label>Content</label>{content_errors}<textarea name="content">{content}</textarea></div>"#,
            r#"<div><label>Delete in</label>{expires_errors}"#,
            r#"<label><input type="radio" name="expires" value="365" {y}> One Year</label>"#,
            r#"<label><input type="radio" name="expires" value="7" {w}> One Week</label>"#,
            r#"<label><input type="radio" name="expires" value="1" {d}> One Day</label></div>"#,
            r#"<div><input type="submit" value="Publish snippet"></div></form>"#,
        ),
        csrf = csrf_input(&ctx.csrf_token),
        title_errors = field_errors(form, "title"),
        title = escape(form.get("title")),
        content_errors = field_errors(form, "content"),
        content = escape(form.get("content")),
        expires_errors = field_errors(form, "expires"),
        y = checked(form.get("expires"), "365"),
        w = checked(form.get("expires"), "7"),
        d = checked(form.get("expires"), "1"),
    );
    layout("Create a New Snippet", ctx, &main)
}

fn checked(value: &str, option: &str) -> &'static str {
    // One week is the default selection on a pristine form
    if value == option || (value.is_empty() && option == "7") {
        "checked"
    } else {
        ""
    }
}

fn generic_error(message: Option<&str>) -> String {
    match message {
        Some(text) => format!(r#"<div class="error">{}</div>"#, escape(text)),
        None => String::new(),
    }
}

pub fn signup_page(ctx: &PageContext, form: &Form, error: Option<&str>) -> Html<String> {
    let main = format!(
        concat!(
            r#"<form method="POST" action="/user/signup" novalidate>{csrf}{generic}"#,
            r#"<div><label>Name</label>{name_errors}<input type="text" name="name" value="{name}"></div>"#,
            r#"<div><label>Email</label>{email_errors}<input type="email" name="email" value="{email}"></div>"#,
            r#"<div><label>Password</label>{password_errors}<input type="password" name="password"></div>"#,
            r#"<div><input type="submit" value="Signup"></div></form>"#,
        ),
        csrf = csrf_input(&ctx.csrf_token),
        generic = generic_error(error),
        name_errors = field_errors(form, "name"),
        name = escape(form.get("name")),
        email_errors = field_errors(form, "email"),
        email = escape(form.get("email")),
        password_errors = field_errors(form, "password"),
    );
    layout("Signup", ctx, &main)
}

pub fn login_page(ctx: &PageContext, form: &Form, error: Option<&str>) -> Html<String> {
    let main = format!(
        concat!(
            r#"<form method="POST" action="/user/login" novalidate>{csrf}{generic}"#,
            r#"<div><label>Email</label>{email_errors}<input type="email" name="email" value="{email}"></div>"#,
            r#"<div><label>Password</label>{password_errors}<input type="password" name="password"></div>"#,
            r#"<div><input type="submit" value="Login"></div></form>"#,
        ),
        csrf = csrf_input(&ctx.csrf_token),
        generic = generic_error(error),
        email_errors = field_errors(form, "email"),
        email = escape(form.get("email")),
        password_errors = field_errors(form, "password"),
    );
    layout("Login", ctx, &main)
}

/// Standalone error page; no session state is consulted so this is safe
/// from any pipeline stage, including panic recovery.
pub fn error_page(text: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"><title>{text} - Snipbin</title></head><body><h1>{text}</h1></body></html>\n",
        text = escape(text),
    ))
}
