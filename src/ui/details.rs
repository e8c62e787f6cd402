use std::rc::Rc;

use gtk::prelude::*;
use gtk::{glib, Box, Button, Label, Orientation, Picture, ScrolledWindow, Window};
use tracing::{error, warn};

use popular_movies::config::AppConfig;
use popular_movies::favorites::FavoritesStore;
use popular_movies::movie::{Bundle, DetailsPayload};

use super::posters::PosterLoader;

fn favorite_label(is_favorite: bool) -> &'static str {
    if is_favorite {
        "★ Remove from favorites"
    } else {
        "☆ Add to favorites"
    }
}

/// Opens the details window for the payload produced by the main screen.
pub fn show_details_window(
    parent: &impl IsA<Window>,
    args: &Bundle,
    config: &AppConfig,
    posters: &PosterLoader,
    favorites: FavoritesStore,
    on_closed: impl Fn() + 'static,
) {
    let Some(payload) = DetailsPayload::from_bundle(args) else {
        error!("Details payload is incomplete: {args:?}");
        on_closed();
        return;
    };

    let dialog = Window::builder()
        .title(payload.title.as_str())
        .transient_for(parent)
        .default_width(640)
        .default_height(720)
        .build();

    let content = Box::new(Orientation::Vertical, 8);
    content.set_margin_start(12);
    content.set_margin_end(12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    let picture = Picture::new();
    picture.set_size_request(-1, 300);
    picture.set_content_fit(gtk::ContentFit::Cover);
    let image_url = payload
        .backdrop_path
        .as_deref()
        .and_then(|path| config.backdrop_url(path))
        .or_else(|| config.poster_url(&payload.poster_path));
    if let Some(url) = image_url {
        posters.load(&url, &picture);
    }
    content.append(&picture);

    let year = if payload.year > 0 {
        payload.year.to_string()
    } else {
        "unknown year".to_string()
    };
    let details = format!(
        "<span size='x-large' weight='bold'>{}</span> ({})\n\n\
        <b>Rating:</b> ⭐ {:.1}/10\n\
        <b>Popularity:</b> {:.1}\n\n\
        {}",
        glib::markup_escape_text(&payload.title),
        year,
        payload.rating,
        payload.popularity,
        glib::markup_escape_text(&payload.synopsis),
    );
    let details_label = Label::new(None);
    details_label.set_markup(&details);
    details_label.set_xalign(0.0);
    details_label.set_wrap(true);

    let scrolled = ScrolledWindow::new();
    scrolled.set_vexpand(true);
    scrolled.set_child(Some(&details_label));
    content.append(&scrolled);

    let favorite_button = Button::with_label(favorite_label(favorites.contains(payload.id)));
    favorite_button.set_halign(gtk::Align::End);
    content.append(&favorite_button);

    let payload = Rc::new(payload);
    favorite_button.connect_clicked(move |button| {
        let result = if favorites.contains(payload.id) {
            favorites.remove(payload.id)
        } else {
            favorites.add(&payload.to_movie())
        };
        if let Err(err) = result {
            warn!("Failed to update favorites: {err}");
        }
        button.set_label(favorite_label(favorites.contains(payload.id)));
    });

    dialog.connect_close_request(move |_| {
        on_closed();
        glib::Propagation::Proceed
    });

    dialog.set_child(Some(&content));
    dialog.present();
}
