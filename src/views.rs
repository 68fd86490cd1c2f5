//! Server-rendered pages.
//!
//! Plain string building; every user-supplied value goes through [`escape`].

use std::fmt::Write as _;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::middleware::session::{FlashKind, FlashShown, SessionContext};
use crate::types::{Campground, CampgroundDetail};

/// A rendered HTML page. Remembers whether it displayed the pending flash so
/// the session layer clears the flash only once it was actually seen.
#[derive(Debug, Clone)]
pub struct Page {
    html: String,
    showed_flash: bool,
}

impl Page {
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn showed_flash(&self) -> bool {
        self.showed_flash
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let mut res = Html(self.html).into_response();
        if self.showed_flash {
            res.extensions_mut().insert(FlashShown);
        }
        res
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn navbar(session: Option<&SessionContext>) -> String {
    let mut nav = String::from(
        r#"<nav class="navbar"><a href="/">YelpCamp</a> <a href="/campgrounds">Campgrounds</a> <a href="/campgrounds/new">New Campground</a>"#,
    );
    match session.and_then(|s| s.principal.as_ref()) {
        Some(p) => {
            let _ = write!(nav, r#" <span class="user">{}</span> <a href="/logout">Logout</a>"#, escape(&p.username));
        }
        None => nav.push_str(r#" <a href="/login">Login</a> <a href="/register">Register</a>"#),
    }
    nav.push_str("</nav>");
    nav
}

fn flash_banner(session: Option<&SessionContext>) -> String {
    match session.and_then(|s| s.flash.as_ref()) {
        Some(flash) => {
            let class = match flash.kind {
                FlashKind::Success => "alert-success",
                FlashKind::Error => "alert-danger",
            };
            format!(r#"<div class="alert {}" role="alert">{}</div>"#, class, escape(&flash.message))
        }
        None => String::new(),
    }
}

fn layout(title: &str, session: Option<&SessionContext>, body: &str) -> Page {
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><title>{title} | YelpCamp</title></head>
<body>
{nav}
<main class="container">
{flash}
{body}
</main>
<footer>&copy; YelpCamp</footer>
</body>
</html>"#,
        title = escape(title),
        nav = navbar(session),
        flash = flash_banner(session),
        body = body,
    );
    Page { html, showed_flash: session.is_some_and(|s| s.flash.is_some()) }
}

pub fn home(session: &SessionContext) -> Page {
    layout(
        "Home",
        Some(session),
        r#"<h1>YelpCamp</h1><p>Welcome to YelpCamp! Jump right in and explore our many campgrounds.</p><a href="/campgrounds">View Campgrounds</a>"#,
    )
}

fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("${:.0}", price)
    } else {
        format!("${:.2}", price)
    }
}

pub fn index(session: &SessionContext, campgrounds: &[Campground]) -> Page {
    let mut body = String::from("<h1>All Campgrounds</h1>");
    if campgrounds.is_empty() {
        body.push_str("<p>No campgrounds yet.</p>");
    }
    for c in campgrounds {
        let image = c
            .images
            .first()
            .map(|img| format!(r#"<img src="{}" alt="">"#, escape(&img.url)))
            .unwrap_or_default();
        let _ = write!(
            body,
            r#"<div class="card">{image}<h5>{title}</h5><p>{description}</p><small>{location}</small> <a href="{path}">View {title}</a></div>"#,
            image = image,
            title = escape(&c.title),
            description = escape(&c.description),
            location = escape(&c.location),
            path = c.path(),
        );
    }
    layout("Campgrounds", Some(session), &body)
}

fn campground_form(action: &str, submit: &str, c: Option<&Campground>) -> String {
    let value = |f: fn(&Campground) -> String| c.map(f).map(|v| escape(&v)).unwrap_or_default();
    let mut form = format!(
        r#"<form action="{action}" method="POST" enctype="multipart/form-data" novalidate>
<label for="title">Title</label><input id="title" name="campground[title]" value="{title}" required>
<label for="location">Location</label><input id="location" name="campground[location]" value="{location}" required>
<label for="price">Campground Price</label><input id="price" name="campground[price]" value="{price}" required>
<label for="description">Description</label><textarea id="description" name="campground[description]">{description}</textarea>
<label for="image-url">Add Image URL</label><input id="image-url" name="campground[images]" type="url">
<label for="image">Upload Images</label><input id="image" name="image" type="file" accept="image/jpeg,image/png,image/gif,image/webp" multiple>
"#,
        action = action,
        title = value(|c| c.title.clone()),
        location = value(|c| c.location.clone()),
        price = value(|c| c.price.to_string()),
        description = value(|c| c.description.clone()),
    );
    if let Some(c) = c {
        for (i, img) in c.images.iter().enumerate() {
            let _ = write!(
                form,
                r#"<img src="{thumb}" alt=""><input type="checkbox" id="image-{i}" name="deleteImages[]" value="{key}"><label for="image-{i}">Delete?</label>"#,
                thumb = escape(&img.thumbnail()),
                i = i,
                key = escape(&img.filename),
            );
        }
    }
    let _ = write!(form, "<button>{}</button></form>", escape(submit));
    form
}

pub fn new_campground(session: &SessionContext) -> Page {
    let body = format!("<h1>New Campground</h1>{}", campground_form("/campgrounds", "Add Campground", None));
    layout("New Campground", Some(session), &body)
}

pub fn edit_campground(session: &SessionContext, campground: &Campground) -> Page {
    let action = format!("{}?_method=PUT", campground.path());
    let body = format!(
        r#"<h1>Edit Campground</h1>{}<a href="{}">Back To Campground</a>"#,
        campground_form(&action, "Update Campground", Some(campground)),
        campground.path()
    );
    layout("Edit Campground", Some(session), &body)
}

pub fn show_campground(session: &SessionContext, detail: &CampgroundDetail) -> Page {
    let c = &detail.campground;
    let viewer = session.principal.as_ref();
    let mut body = String::new();

    let map = match c.geometry {
        Some(g) => format!(r#"<div id="map" data-lng="{}" data-lat="{}"></div>"#, g.longitude, g.latitude),
        None => String::new(),
    };
    body.push_str(&map);
    for img in &c.images {
        let _ = write!(body, r#"<img class="campground-image" src="{}" alt="">"#, escape(&img.url));
    }
    let _ = write!(
        body,
        r#"<h1>{title}</h1><p>{description}</p><p class="location">{location}</p><p class="author">Submitted by {author}</p><p class="price">{price}/night</p>"#,
        title = escape(&c.title),
        description = escape(&c.description),
        location = escape(&c.location),
        author = detail.author.as_ref().map(|a| escape(&a.username)).unwrap_or_else(|| "unknown".to_string()),
        price = format_price(c.price),
    );
    if viewer.is_some_and(|p| c.is_owned_by(p.id)) {
        let _ = write!(
            body,
            r#"<a class="edit" href="{path}/edit">Edit</a><form class="delete" action="{path}?_method=DELETE" method="POST"><button>Delete</button></form>"#,
            path = c.path(),
        );
    }

    body.push_str("<h2>Reviews</h2>");
    if viewer.is_some() {
        let _ = write!(
            body,
            r#"<form action="{path}/reviews" method="POST" novalidate>
<label for="rating">Rating</label><input type="range" min="1" max="5" id="rating" name="review[rating]" value="3">
<label for="body">Review Text</label><textarea id="body" name="review[body]" required></textarea>
<button>Submit</button></form>"#,
            path = c.path(),
        );
    }
    for rv in &detail.reviews {
        let r = &rv.review;
        let _ = write!(
            body,
            r#"<div class="review"><h5>By {author}</h5><p class="rating" data-rating="{rating}">Rated: {rating} stars</p><p>{text}</p>"#,
            author = escape(&rv.author),
            rating = r.rating,
            text = escape(&r.body),
        );
        if viewer.is_some_and(|p| p.id == r.author_id) {
            let _ = write!(
                body,
                r#"<form action="{}/reviews/{}?_method=DELETE" method="POST"><button>Delete</button></form>"#,
                c.path(),
                r.id
            );
        }
        body.push_str("</div>");
    }
    layout(&c.title, Some(session), &body)
}

pub fn register(session: &SessionContext) -> Page {
    layout(
        "Register",
        Some(session),
        r#"<h1>Register</h1><form action="/register" method="POST">
<label for="username">Username</label><input id="username" name="username" required autofocus>
<label for="email">Email</label><input id="email" name="email" type="email" required>
<label for="password">Password</label><input id="password" name="password" type="password" required>
<button>Register</button></form>"#,
    )
}

pub fn login(session: &SessionContext) -> Page {
    layout(
        "Login",
        Some(session),
        r#"<h1>Login</h1><form action="/login" method="POST">
<label for="username">Username</label><input id="username" name="username" required autofocus>
<label for="password">Password</label><input id="password" name="password" type="password" required>
<button>Login</button></form>"#,
    )
}

/// Error pages show the pending flash only when the caller has the session.
pub fn error_page(status: StatusCode, message: &str, session: Option<&SessionContext>) -> Page {
    let body = format!(
        r#"<div class="alert alert-danger" role="alert"><h4>{code} {reason}</h4><p>{message}</p></div><a href="/campgrounds">Back to campgrounds</a>"#,
        code = status.as_u16(),
        reason = status.canonical_reason().unwrap_or("Error"),
        message = escape(message),
    );
    layout("Error", session, &body)
}
