use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use gdk_pixbuf::Pixbuf;
use gtk::prelude::*;
use gtk::{gio, glib, Picture};
use tracing::{debug, warn};

use popular_movies::tmdb::TmdbClient;

/// Downloads images on one background thread and hands decoded pixbufs to
/// the pictures waiting for them.
pub struct PosterLoader {
    requests: async_channel::Sender<String>,
    cache: RefCell<HashMap<String, Pixbuf>>,
    waiting: RefCell<HashMap<String, Vec<Picture>>>,
}

impl PosterLoader {
    pub fn new(client: Arc<TmdbClient>) -> Rc<Self> {
        let (requests, request_rx) = async_channel::unbounded::<String>();
        let (done_tx, done_rx) =
            async_channel::unbounded::<(String, popular_movies::Result<Vec<u8>>)>();

        std::thread::spawn(move || {
            while let Ok(url) = request_rx.recv_blocking() {
                let result = client.fetch_image(&url);
                if done_tx.send_blocking((url, result)).is_err() {
                    break;
                }
            }
        });

        let loader = Rc::new(PosterLoader {
            requests,
            cache: RefCell::new(HashMap::new()),
            waiting: RefCell::new(HashMap::new()),
        });

        let weak = Rc::downgrade(&loader);
        glib::spawn_future_local(async move {
            while let Ok((url, result)) = done_rx.recv().await {
                let Some(loader) = weak.upgrade() else {
                    break;
                };
                loader.finish(url, result);
            }
        });

        loader
    }

    /// Shows the image at `url` in `picture`, downloading it if needed.
    pub fn load(&self, url: &str, picture: &Picture) {
        if let Some(pixbuf) = self.cache.borrow().get(url) {
            picture.set_pixbuf(Some(pixbuf));
            return;
        }

        let mut waiting = self.waiting.borrow_mut();
        if let Some(pictures) = waiting.get_mut(url) {
            pictures.push(picture.clone());
            return;
        }
        waiting.insert(url.to_string(), vec![picture.clone()]);
        if self.requests.try_send(url.to_string()).is_err() {
            warn!("Image loader stopped; {url} not requested");
        }
    }

    fn finish(&self, url: String, result: popular_movies::Result<Vec<u8>>) {
        let pictures = self.waiting.borrow_mut().remove(&url).unwrap_or_default();
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Failed to load {url}: {err}");
                return;
            }
        };

        let stream = gio::MemoryInputStream::from_bytes(&glib::Bytes::from_owned(bytes));
        match Pixbuf::from_stream(&stream, gio::Cancellable::NONE) {
            Ok(pixbuf) => {
                debug!("loaded {url} for {} pictures", pictures.len());
                for picture in &pictures {
                    picture.set_pixbuf(Some(&pixbuf));
                }
                self.cache.borrow_mut().insert(url, pixbuf);
            }
            Err(err) => warn!("Couldn't decode {url}: {err}"),
        }
    }
}
