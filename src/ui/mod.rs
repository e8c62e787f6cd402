mod details;
mod grid;
mod posters;
mod settings;

use std::cell::RefCell;
use std::rc::Rc;

use gtk::prelude::*;
use gtk::{
    gio, glib, Application, ApplicationWindow, Box, Button, Entry, FlowBox, HeaderBar, Label,
    MenuButton, Orientation, ScrolledWindow, Window,
};
use tracing::{debug, error, info};

use popular_movies::config::{self, AppConfig, CONFIG_FILE};
use popular_movies::favorites::FavoritesStore;
use popular_movies::movie::Movie;
use popular_movies::runtime::TaskRunner;
use popular_movies::screen::{Effect, MainScreen, MenuItem, Navigation, ScreenEvent};
use popular_movies::services::Services;
use popular_movies::settings::Settings;

use self::posters::PosterLoader;

/// Widgets of the main window the host touches after construction.
struct MainView {
    window: ApplicationWindow,
    grid: FlowBox,
    mode_label: Label,
    error_bar: Box,
    error_label: Label,
    retry_button: Button,
}

/// Owns the main screen and carries out the effects it returns.
struct Host {
    screen: RefCell<MainScreen>,
    settings: Rc<RefCell<Settings>>,
    favorites: FavoritesStore,
    runner: TaskRunner,
    config: AppConfig,
    posters: Rc<PosterLoader>,
    view: MainView,
    dataset: RefCell<Vec<Movie>>,
}

impl Host {
    fn dispatch(self: &Rc<Self>, event: ScreenEvent) {
        let mode = self.settings.borrow().sort_mode();
        let effects = self.screen.borrow_mut().handle(event, mode);
        self.apply(effects);
        if !self.screen.borrow().is_waiting_for_details() {
            self.view.window.set_sensitive(true);
        }
    }

    fn resume(self: &Rc<Self>) {
        let mode = self.settings.borrow().sort_mode();
        self.view.mode_label.set_text(mode.label());
        let effects = self.screen.borrow_mut().on_resume(mode);
        self.apply(effects);
    }

    fn retry(self: &Rc<Self>) {
        let mode = self.settings.borrow().sort_mode();
        let effects = self.screen.borrow_mut().on_retry(mode);
        self.apply(effects);
    }

    fn select(self: &Rc<Self>, index: usize) {
        let Some(movie) = self.dataset.borrow().get(index).cloned() else {
            return;
        };
        let effects = self.screen.borrow_mut().on_item_selected(&movie);
        self.apply(effects);
    }

    fn menu(self: &Rc<Self>, item: MenuItem<'_>) {
        let effect = self.screen.borrow().on_menu_item(item);
        match effect {
            Some(effect) => self.apply(vec![effect]),
            None => debug!("menu item {item:?} not handled"),
        }
    }

    fn apply(self: &Rc<Self>, effects: Vec<Effect>) {
        let cancel = self.screen.borrow().cancel_token();
        for effect in effects {
            if self.runner.spawn(&effect, &cancel) {
                if matches!(effect, Effect::Backfill { .. }) {
                    // Navigation waits on the backfill; keep the grid inert.
                    self.view.window.set_sensitive(false);
                }
                continue;
            }
            match effect {
                Effect::Render(movies) => {
                    self.view.error_bar.set_visible(false);
                    grid::fill_grid(&self.view.grid, &movies, &self.config, &self.posters);
                    *self.dataset.borrow_mut() = movies;
                }
                Effect::ShowError { message, retry } => {
                    self.view.error_label.set_text(&message);
                    self.view.retry_button.set_visible(retry);
                    self.view.error_bar.set_visible(true);
                }
                Effect::Navigate(Navigation::Details(args)) => {
                    let host = self.clone();
                    details::show_details_window(
                        &self.view.window,
                        &args,
                        &self.config,
                        &self.posters,
                        self.favorites.clone(),
                        move || host.resume(),
                    );
                }
                Effect::Navigate(Navigation::Settings) => {
                    let host = self.clone();
                    settings::show_settings_window(
                        &self.view.window,
                        self.settings.clone(),
                        move || host.resume(),
                    );
                }
                Effect::FetchList { .. } | Effect::Backfill { .. } => {}
            }
        }
    }

    fn destroy(&self) {
        self.screen.borrow_mut().on_destroy();
    }
}

fn show_api_key_dialog(window: &ApplicationWindow) -> Option<String> {
    let dialog = Window::builder()
        .title("TMDB API Key Required")
        .modal(true)
        .transient_for(window)
        .default_width(500)
        .default_height(200)
        .build();

    let content = Box::new(Orientation::Vertical, 12);
    content.set_margin_start(12);
    content.set_margin_end(12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    let info_label = Label::new(Some(
        "To browse movies, you need a TMDB API key.\n\
        Get one free at: https://www.themoviedb.org/settings/api\n\n\
        Enter your API key below:",
    ));
    info_label.set_wrap(true);

    let api_entry = Entry::new();
    api_entry.set_placeholder_text(Some("Enter TMDB API key"));

    let button_box = Box::new(Orientation::Horizontal, 8);
    button_box.set_halign(gtk::Align::End);
    let ok_btn = Button::with_label("OK");
    button_box.append(&ok_btn);

    content.append(&info_label);
    content.append(&api_entry);
    content.append(&button_box);

    dialog.set_child(Some(&content));

    let api_key = Rc::new(RefCell::new(String::new()));
    let api_key_clone = api_key.clone();
    let dialog_clone = dialog.clone();

    ok_btn.connect_clicked(move |_| {
        *api_key_clone.borrow_mut() = api_entry.text().trim().to_string();
        dialog_clone.close();
    });

    dialog.present();

    while dialog.is_visible() {
        glib::MainContext::default().iteration(true);
    }

    let key = api_key.borrow().clone();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

fn build_main_view(app: &Application, columns: u32) -> MainView {
    let window = ApplicationWindow::builder()
        .application(app)
        .title("Popular Movies")
        .default_width(480)
        .default_height(800)
        .build();

    let header = HeaderBar::new();
    let mode_label = Label::new(None);
    mode_label.set_opacity(0.7);
    header.pack_start(&mode_label);

    let menu = gio::Menu::new();
    menu.append(Some("Settings"), Some("win.settings"));
    let menu_button = MenuButton::new();
    menu_button.set_icon_name("open-menu-symbolic");
    menu_button.set_menu_model(Some(&menu));
    header.pack_end(&menu_button);
    window.set_titlebar(Some(&header));

    let main_box = Box::new(Orientation::Vertical, 0);

    let error_bar = Box::new(Orientation::Horizontal, 12);
    error_bar.set_margin_start(12);
    error_bar.set_margin_end(12);
    error_bar.set_margin_top(6);
    error_bar.set_margin_bottom(6);
    let error_label = Label::new(None);
    error_label.set_xalign(0.0);
    error_label.set_hexpand(true);
    error_label.set_wrap(true);
    error_bar.append(&error_label);
    let retry_button = Button::with_label("Retry");
    error_bar.append(&retry_button);
    error_bar.set_visible(false);
    main_box.append(&error_bar);

    let scrolled = ScrolledWindow::new();
    scrolled.set_vexpand(true);
    scrolled.set_hexpand(true);

    let grid = FlowBox::new();
    grid.set_selection_mode(gtk::SelectionMode::None);
    grid.set_activate_on_single_click(true);
    grid.set_homogeneous(true);
    grid.set_min_children_per_line(columns);
    grid.set_max_children_per_line(columns);
    grid.set_valign(gtk::Align::Start);
    scrolled.set_child(Some(&grid));
    main_box.append(&scrolled);

    window.set_child(Some(&main_box));

    MainView {
        window,
        grid,
        mode_label,
        error_bar,
        error_label,
        retry_button,
    }
}

pub fn build_ui(app: &Application) {
    let mut cfg = config::load_config();
    let view = build_main_view(app, cfg.grid_columns);

    if cfg.tmdb_api_key.is_none() {
        match show_api_key_dialog(&view.window) {
            Some(key) => {
                if let Err(err) = config::store_api_key(&config::config_dir().join(CONFIG_FILE), &key) {
                    error!("Failed to save API key: {err}");
                }
                cfg.tmdb_api_key = Some(key);
            }
            None => {
                error!("No API key provided. Exiting.");
                view.window.close();
                return;
            }
        }
    }

    let services = match Services::open(&cfg, &config::data_dir()) {
        Ok(services) => services,
        Err(err) => {
            error!("Failed to start: {err}");
            view.window.close();
            return;
        }
    };
    let Services {
        settings,
        favorites,
        client,
        runner,
        events,
    } = services;

    let host = Rc::new(Host {
        screen: RefCell::new(MainScreen::new()),
        settings: Rc::new(RefCell::new(settings)),
        favorites: favorites.clone(),
        runner,
        posters: PosterLoader::new(client),
        config: cfg,
        view,
        dataset: RefCell::new(Vec::new()),
    });

    // Favorites snapshots go through the same channel as network results so
    // every screen callback runs on the main context.
    let subscription = favorites.subscribe();
    let favorite_snapshots = subscription.receiver();
    host.screen.borrow_mut().attach_favorites(subscription);
    let forward = host.runner.events();
    glib::spawn_future_local(async move {
        while let Ok(snapshot) = favorite_snapshots.recv().await {
            if forward.send(ScreenEvent::FavoritesChanged(snapshot)).await.is_err() {
                break;
            }
        }
    });

    let host_clone = host.clone();
    glib::spawn_future_local(async move {
        while let Ok(event) = events.recv().await {
            host_clone.dispatch(event);
        }
    });

    let host_clone = host.clone();
    host.view.retry_button.connect_clicked(move |_| host_clone.retry());

    let host_clone = host.clone();
    host.view.grid.connect_child_activated(move |_, child| {
        if let Ok(index) = usize::try_from(child.index()) {
            host_clone.select(index);
        }
    });

    let settings_action = gio::SimpleAction::new("settings", None);
    let host_clone = host.clone();
    settings_action.connect_activate(move |_, _| host_clone.menu(MenuItem::Settings));
    host.view.window.add_action(&settings_action);

    let host_clone = host.clone();
    host.view.window.connect_close_request(move |_| {
        host_clone.destroy();
        glib::Propagation::Proceed
    });

    let mode = host.settings.borrow().sort_mode();
    host.view.mode_label.set_text(mode.label());
    let effects = host.screen.borrow_mut().on_activate(mode);
    host.apply(effects);

    info!("main window ready");
    host.view.window.present();
}
