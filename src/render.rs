//! HTML projection of a portfolio.
//!
//! [`render_document`] turns a [`Document`] into one self-contained HTML file,
//! one `<section>` per page in document order. Images are already data URIs,
//! so the file has no external references. The active theme is injected as
//! CSS custom properties and the page size as an `@page` rule; everything
//! else comes from `static/portfolio.css`, embedded at compile time.
//!
//! The result is what the print-to-PDF step receives.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating,
//! which escapes all user text.

use crate::config::PageSize;
use crate::document::Document;
use crate::imaging::ImageData;
use crate::theme::ThemeStyle;
use crate::types::{ImageText, Page, SeriesText, UserIdentity};
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS_STATIC: &str = include_str!("../static/portfolio.css");

const INSTAGRAM_ICON: &str = "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 24 24'><path d='M7.75 2h8.5A5.75 5.75 0 0 1 22 7.75v8.5A5.75 5.75 0 0 1 16.25 22h-8.5A5.75 5.75 0 0 1 2 16.25v-8.5A5.75 5.75 0 0 1 7.75 2ZM12 7a5 5 0 1 0 0 10a5 5 0 0 0 0-10Zm0 1.5a3.5 3.5 0 1 1 0 7a3.5 3.5 0 0 1 0-7Zm5.25-.25a1 1 0 1 1 0-2a1 1 0 0 1 0 2Z'/></svg>";

/// Render the whole document as an HTML string.
pub fn render_document(document: &Document, page_size: PageSize) -> String {
    let identity = document.identity();
    let css = format!(
        "{}\n{}\n{}",
        theme_css(&identity.theme),
        page_css(page_size),
        CSS_STATIC
    );
    let title = if identity.name.is_empty() {
        identity.portfolio_label.clone()
    } else {
        format!("{} · {}", identity.name, identity.portfolio_label)
    };

    let ordinals = document.series_ordinals();
    let content = html! {
        @if document.is_empty() {
            div class="empty" { "No pages yet." }
        }
        @for (page, ordinal) in document.pages().zip(ordinals) {
            (render_page(page, ordinal.unwrap_or(0)))
        }
    };
    base_document(&title, &css, content).into_string()
}

/// Theme as CSS custom properties on `:root`.
///
/// Colors and size are already normalized; the font family is free text and
/// must not close the `<style>` element.
pub fn theme_css(theme: &ThemeStyle) -> String {
    let font_family = theme.font_family.replace(['<', '>', '{', '}'], "");
    format!(
        ":root {{\n    --paper: {};\n    --text: {};\n    --muted: {};\n    --font-family: {};\n    --base-font-size: {};\n}}",
        theme.paper, theme.text, theme.muted, font_family, theme.body_font_size
    )
}

fn page_css(size: PageSize) -> String {
    format!("@page {{ size: {}; margin: 0; }}", size.css())
}

fn base_document(title: &str, css: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body {
                (content)
            }
        }
    }
}

/// One page. `ordinal` is the series position for series images, else 0.
pub fn render_page(page: &Page, ordinal: usize) -> Markup {
    match page {
        Page::Cover { data } => render_cover(data),
        Page::Single { data, image } => render_single(data, image.as_ref()),
        Page::SeriesCover { data, .. } => render_series_cover(data),
        Page::SeriesImage {
            data,
            image,
            series_total,
            ..
        } => render_series_image(data, image.as_ref(), ordinal, *series_total),
    }
}

fn or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

fn render_cover(identity: &UserIdentity) -> Markup {
    let profile = or(&identity.instagram, "#");
    html! {
        section class="page cover" {
            div class="label portfolio-label" { (or(&identity.portfolio_label, "Portfolio")) }
            h1 class="name" { (or(&identity.name, "Your Name")) }
            @if !identity.years.is_empty() {
                h2 class="years" { (identity.years) }
            }
            @if !identity.statement.is_empty() {
                div class="meta statement" { (identity.statement) }
            }
            div class="links" {
                @if !identity.instagram.is_empty() || !identity.username.is_empty() {
                    div class="social" {
                        @if !identity.instagram.is_empty() {
                            a class="icon" href=(identity.instagram) title="Instagram" {
                                (PreEscaped(INSTAGRAM_ICON))
                            }
                        }
                        @if !identity.username.is_empty() {
                            div class="username" {
                                a href=(profile) { (identity.username) }
                            }
                        }
                    }
                }
                @if !identity.email.is_empty() {
                    div class="email" {
                        a href={ "mailto:" (identity.email) } { (identity.email) }
                    }
                }
            }
        }
    }
}

fn render_image(image: Option<&ImageData>, alt: &str, placeholder: &str) -> Markup {
    html! {
        div class="image-wrap" {
            @match image {
                Some(image) => {
                    img src=(image.as_str()) alt=(alt);
                }
                None => {
                    div class="placeholder" { (placeholder) }
                }
            }
        }
    }
}

fn render_single(data: &ImageText, image: Option<&ImageData>) -> Markup {
    html! {
        section class="page single" {
            (render_image(image, or(&data.title, "Image"), "Drop image here"))
            div class="fixed-meta" {
                div class="title" { (or(&data.title, "Untitled")) }
                div class="desc" { (data.desc) }
            }
            div class="fixed-year year" { (data.year) }
        }
    }
}

fn render_series_cover(data: &SeriesText) -> Markup {
    html! {
        section class="page series-cover" {
            div class="series-header" {
                div class="title" { (or(&data.title, "Untitled Project")) }
                @if !data.year.is_empty() {
                    div class="meta" { (data.year) }
                }
            }
            @if !data.desc.is_empty() {
                div class="series-desc" { (data.desc) }
            }
            div class="series-info" { (data.total) " images · Project" }
        }
    }
}

fn render_series_image(
    data: &ImageText,
    image: Option<&ImageData>,
    ordinal: usize,
    total: usize,
) -> Markup {
    let fallback_title = format!("Image {ordinal}");
    let title = or(&data.title, &fallback_title);
    html! {
        section class="page series-image" {
            div class="series-tag" { "Image " (ordinal) " of " (total) }
            (render_image(image, title, &format!("Drop image for: {title}")))
            div class="fixed-meta" {
                div class="title" { (title) }
                div class="desc" { (data.desc) }
            }
            div class="fixed-year year" { (data.year) }
        }
    }
}
