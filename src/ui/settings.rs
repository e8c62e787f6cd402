use std::cell::RefCell;
use std::rc::Rc;

use gtk::prelude::*;
use gtk::{glib, Box, DropDown, Label, Orientation, StringList, Window};
use tracing::error;

use popular_movies::settings::Settings;
use popular_movies::sort::SortMode;

/// Opens the settings window. `on_closed` runs once it goes away.
pub fn show_settings_window(
    parent: &impl IsA<Window>,
    settings: Rc<RefCell<Settings>>,
    on_closed: impl Fn() + 'static,
) {
    let dialog = Window::builder()
        .title("Settings")
        .modal(true)
        .transient_for(parent)
        .default_width(360)
        .default_height(120)
        .build();

    let content = Box::new(Orientation::Horizontal, 12);
    content.set_margin_start(12);
    content.set_margin_end(12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    let labels: Vec<&str> = SortMode::ALL.iter().map(|m| m.label()).collect();
    let dropdown = DropDown::new(Some(StringList::new(&labels)), None::<gtk::Expression>);
    let current = settings.borrow().sort_mode();
    let selected = SortMode::ALL.iter().position(|m| *m == current).unwrap_or(0);
    dropdown.set_selected(selected as u32);
    dropdown.set_hexpand(true);

    content.append(&Label::new(Some("Sort order:")));
    content.append(&dropdown);
    dialog.set_child(Some(&content));

    dropdown.connect_selected_notify(move |dropdown| {
        let Some(mode) = SortMode::ALL.get(dropdown.selected() as usize) else {
            return;
        };
        if let Err(err) = settings.borrow_mut().set_sort_mode(*mode) {
            error!("Failed to save sort order: {err}");
        }
    });

    dialog.connect_close_request(move |_| {
        on_closed();
        glib::Propagation::Proceed
    });

    dialog.present();
}
