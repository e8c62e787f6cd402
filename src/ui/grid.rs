use gtk::prelude::*;
use gtk::{Box, FlowBox, Label, Orientation, Picture};

use popular_movies::config::AppConfig;
use popular_movies::movie::Movie;

use super::posters::PosterLoader;

const POSTER_WIDTH: i32 = 185;
const POSTER_HEIGHT: i32 = 278;

pub fn create_movie_card(movie: &Movie, config: &AppConfig, posters: &PosterLoader) -> Box {
    let card = Box::new(Orientation::Vertical, 4);
    card.set_margin_start(6);
    card.set_margin_end(6);
    card.set_margin_top(6);
    card.set_margin_bottom(6);

    let picture = Picture::new();
    picture.set_size_request(POSTER_WIDTH, POSTER_HEIGHT);
    picture.set_content_fit(gtk::ContentFit::Cover);
    picture.set_can_shrink(true);
    if let Some(url) = config.poster_url(&movie.poster_path) {
        posters.load(&url, &picture);
    }

    let title_label = Label::new(None);
    title_label.set_markup(&format!("<b>{}</b>", gtk::glib::markup_escape_text(&movie.original_title)));
    title_label.set_wrap(true);
    title_label.set_max_width_chars(20);
    title_label.set_justify(gtk::Justification::Center);

    card.append(&picture);
    card.append(&title_label);

    if !movie.is_partial() {
        let info_label = Label::new(Some(&format!("⭐ {:.1}/10", movie.vote_average)));
        info_label.set_opacity(0.7);
        card.append(&info_label);
    }

    card
}

/// Replaces every card in `grid` with cards for `movies`.
pub fn fill_grid(grid: &FlowBox, movies: &[Movie], config: &AppConfig, posters: &PosterLoader) {
    while let Some(child) = grid.first_child() {
        grid.remove(&child);
    }
    for movie in movies {
        grid.append(&create_movie_card(movie, config, posters));
    }
}
