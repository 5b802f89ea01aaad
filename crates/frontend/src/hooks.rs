//! Hooks bridging shell state into components

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

/// Current value of a watch channel; the component re-renders on every
/// published change.
///
/// `subscribe` runs once, on first render.
#[hook]
pub fn use_watch<T, F>(subscribe: F) -> T
where
    T: Clone + 'static,
    F: FnOnce() -> watch::Receiver<T>,
{
    let receiver = use_memo((), move |_| subscribe());
    let value = use_state({
        let receiver = receiver.clone();
        move || receiver.borrow().clone()
    });

    {
        let value = value.clone();
        use_effect_with((), move |_| {
            let stop = CancellationToken::new();
            let mut receiver = (*receiver).clone();
            let cancelled = stop.clone();
            spawn_local(async move {
                loop {
                    tokio::select! {
                        () = cancelled.cancelled() => break,
                        changed = receiver.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            value.set(receiver.borrow_and_update().clone());
                        }
                    }
                }
            });
            move || stop.cancel()
        });
    }

    (*value).clone()
}
