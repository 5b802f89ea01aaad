use appshell_core::ShellConfig;
use appshell_frontend::{App, AppProps, logging};
use std::rc::Rc;

fn main() {
    console_error_panic_hook::set_once();

    let config = ShellConfig::from_build_env();
    logging::init(&config.log_level);

    yew::Renderer::<App>::with_props(AppProps {
        config: Rc::new(config),
    })
    .render();
}
