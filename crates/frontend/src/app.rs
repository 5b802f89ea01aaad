use crate::browser::{self, BrowserReloader, BrowserStorage};
use crate::hooks::use_watch;
use crate::oidc::BrowserIdentity;
use crate::push::WebSocketTransport;
use crate::routes::{self, Route};
use crate::theme;
use appshell_core::language::{LANG_ENGLISH, LANG_FRENCH, LANG_SYSTEM};
use appshell_core::notify::{PARAMS_CHANGING_ERROR, PARAMS_RETRIEVING_ERROR};
use appshell_core::{AppShell, ConfigClient, CoreResult, SessionStorage, ShellConfig, ShellPorts};
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlSelectElement;
use yew::prelude::*;

/// Wire the browser implementations into a shell
fn build_shell(config: &ShellConfig) -> CoreResult<Rc<AppShell>> {
    let base = browser::document_base()?;
    let client = ConfigClient::builder()
        .base_url(browser::resolve(&base, &config.config_api_url)?)
        .idp_settings_url(browser::resolve(&base, &config.idp_settings_url)?)
        .app_name(&config.app_name)
        .common_namespace(&config.common_namespace)
        .build()?;
    debug!(base_url = client.base_url(), "Configuration client ready");
    let client = Rc::new(client);
    let storage: Rc<dyn SessionStorage> = Rc::new(BrowserStorage);

    let shell = AppShell::new(
        config,
        &browser::current_pathname(),
        &browser::system_locale(),
        ShellPorts {
            identity: Rc::new(BrowserIdentity::new(storage.clone())),
            settings: client.clone(),
            api: client,
            transport: Rc::new(WebSocketTransport::new(
                &config.config_notification_url,
                &config.app_name,
            )),
            storage,
            reloader: Rc::new(BrowserReloader),
            spawner: browser::browser_spawner(),
        },
    );
    Ok(Rc::new(shell))
}

/// Text for the current computed language
fn tr(language: &str, key: &str) -> &'static str {
    let french = language == LANG_FRENCH;
    match (key, french) {
        ("connected", false) => "Connected",
        ("connected", true) => "Connecté",
        ("notFound", false) => "Page not found",
        ("notFound", true) => "Page introuvable",
        ("logoutFailed", false) => "Error: logout failed; you are still logged in.",
        ("logoutFailed", true) => "Erreur : la déconnexion a échoué, vous êtes toujours connecté.",
        ("login", false) => "Sign in",
        ("login", true) => "Se connecter",
        ("logout", false) => "Sign out",
        ("logout", true) => "Se déconnecter",
        ("loading", false) => "Loading…",
        ("loading", true) => "Chargement…",
        ("theme", false) => "Theme",
        ("theme", true) => "Thème",
        (PARAMS_RETRIEVING_ERROR, false) => "Error while retrieving the parameters",
        (PARAMS_RETRIEVING_ERROR, true) => "Erreur lors de la récupération des paramètres",
        (PARAMS_CHANGING_ERROR, false) => "Error while changing the parameter",
        (PARAMS_CHANGING_ERROR, true) => "Erreur lors de la modification du paramètre",
        (_, false) => "Error",
        (_, true) => "Erreur",
    }
}

#[derive(Properties)]
pub struct AppProps {
    pub config: Rc<ShellConfig>,
}

impl PartialEq for AppProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.config, &other.config)
    }
}

#[function_component(App)]
pub fn app(props: &AppProps) -> Html {
    let shell = use_memo((), {
        let config = props.config.clone();
        move |_| build_shell(&config)
    });

    match &*shell {
        Ok(shell) => html! {
            <ShellView shell={shell.clone()} config={props.config.clone()} />
        },
        Err(err) => html! {
            <div class="min-h-screen flex items-center justify-center bg-white dark:bg-gray-900">
                <p class="text-red-600 dark:text-red-400">{ err.to_string() }</p>
            </div>
        },
    }
}

#[derive(Properties)]
struct ShellViewProps {
    shell: Rc<AppShell>,
    config: Rc<ShellConfig>,
}

impl PartialEq for ShellViewProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shell, &other.shell) && Rc::ptr_eq(&self.config, &other.config)
    }
}

#[function_component(ShellView)]
fn shell_view(props: &ShellViewProps) -> Html {
    let shell = props.shell.clone();

    // Run for the lifetime of the view
    {
        let shell = shell.clone();
        use_effect_with((), move |_| {
            let runner = shell.clone();
            spawn_local(async move { runner.run().await });
            move || shell.shutdown()
        });
    }

    let session = use_watch({
        let shell = shell.clone();
        move || shell.subscribe_session()
    });
    let user = use_watch({
        let shell = shell.clone();
        move || shell.subscribe_user()
    });
    let params = use_watch({
        let shell = shell.clone();
        move || shell.subscribe_parameters()
    });
    let path = use_state(browser::current_pathname);
    let route = Route::classify(&path, &props.config);

    use_effect_with(params.theme.clone(), |value| theme::update_document_theme(value));
    use_effect_with(params.computed_language.clone(), |value| {
        theme::update_document_language(value);
    });

    // Callback routes are completed once the manager exists
    {
        let shell = shell.clone();
        let path = path.clone();
        let config = props.config.clone();
        let ready = session.manager().is_some();
        let signed_in = user.is_some();
        use_effect_with((ready, signed_in, route), move |&(ready, signed_in, route)| {
            match (ready, signed_in, route) {
                (true, false, Route::SignInCallback) => spawn_local(async move {
                    if let Err(err) = shell.complete_sign_in().await {
                        warn!(error = %err, "Sign-in callback failed");
                    }
                }),
                (true, _, Route::SilentRenewCallback) => spawn_local(async move {
                    if let Err(err) = shell.complete_silent_renew().await {
                        warn!(error = %err, "Silent renew callback failed");
                    }
                }),
                (_, true, Route::SignInCallback) => {
                    let target = routes::after_sign_in(shell.pre_login_path(), &config);
                    browser::replace_path(&target);
                    path.set(target);
                }
                (_, false, Route::LogoutCallback) => {
                    browser::replace_path(routes::HOME);
                    path.set(routes::HOME.to_string());
                }
                _ => {}
            }
        });
    }

    let language = params.computed_language.clone();
    let body = match (&user, route) {
        (_, Route::SilentRenewCallback) => html! {},
        (Some(_), Route::Home | Route::SignInCallback) => html! {
            <h3 class="mt-20 text-center text-3xl text-gray-900 dark:text-gray-100">
                { tr(&language, "connected") }
            </h3>
        },
        (Some(_), Route::LogoutCallback) => html! {
            <h1 class="text-center text-red-600">{ tr(&language, "logoutFailed") }</h1>
        },
        (Some(_), Route::NotFound) => html! {
            <h1 class="text-center text-gray-900 dark:text-gray-100">{ tr(&language, "notFound") }</h1>
        },
        (None, _) => {
            let on_login = {
                let shell = shell.clone();
                Callback::from(move |_: MouseEvent| {
                    let shell = shell.clone();
                    spawn_local(async move {
                        if let Err(err) = shell.login(&browser::current_pathname()).await {
                            warn!(error = %err, "Sign-in failed");
                        }
                    });
                })
            };
            if let Some(error) = session.error() {
                html! {
                    <p class="mt-20 text-center text-red-600 dark:text-red-400">{ error }</p>
                }
            } else if session.is_pending() {
                html! {
                    <p class="mt-20 text-center text-gray-500">{ tr(&language, "loading") }</p>
                }
            } else {
                html! {
                    <div class="mt-20 flex justify-center">
                        <button onclick={on_login}
                            class="px-4 py-2 rounded bg-blue-600 text-white hover:bg-blue-700">
                            { tr(&language, "login") }
                        </button>
                    </div>
                }
            }
        }
    };

    html! {
        <div class="min-h-screen bg-white dark:bg-gray-900">
            <TopBar shell={shell.clone()} app_name={props.config.app_name.clone()} />
            <Notifications shell={shell} />
            { body }
        </div>
    }
}

#[derive(Properties)]
struct ShellProps {
    shell: Rc<AppShell>,
    #[prop_or_default]
    app_name: String,
}

impl PartialEq for ShellProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shell, &other.shell) && self.app_name == other.app_name
    }
}

#[function_component(TopBar)]
fn top_bar(props: &ShellProps) -> Html {
    let shell = props.shell.clone();
    let user = use_watch({
        let shell = shell.clone();
        move || shell.subscribe_user()
    });
    let params = use_watch({
        let shell = shell.clone();
        move || shell.subscribe_parameters()
    });
    let language = params.computed_language.clone();

    let on_theme = {
        let shell = shell.clone();
        let next = theme::toggled(&params.theme);
        Callback::from(move |_: MouseEvent| {
            let shell = shell.clone();
            spawn_local(async move { shell.change_theme(next).await });
        })
    };
    let on_language = {
        let shell = shell.clone();
        Callback::from(move |event: Event| {
            let Some(select) = event.target_dyn_into::<HtmlSelectElement>() else {
                return;
            };
            let shell = shell.clone();
            spawn_local(async move { shell.change_language(&select.value()).await });
        })
    };
    let on_logout = Callback::from(move |_: MouseEvent| {
        let shell = shell.clone();
        spawn_local(async move {
            if let Err(err) = shell.logout().await {
                warn!(error = %err, "Sign-out failed");
            }
        });
    });

    let controls = user.map(|user| {
        html! {
            <div class="flex items-center gap-4">
                <button onclick={on_theme} class="text-gray-600 dark:text-gray-300">
                    { format!("{}: {}", tr(&language, "theme"), params.theme) }
                </button>
                <select onchange={on_language}
                    class="bg-transparent text-gray-600 dark:text-gray-300">
                    { for [LANG_SYSTEM, LANG_ENGLISH, LANG_FRENCH].into_iter().map(|option| html! {
                        <option value={option} selected={params.language == option}>
                            { option.to_uppercase() }
                        </option>
                    }) }
                </select>
                <span class="text-gray-900 dark:text-gray-100">{ user.display_name().to_string() }</span>
                <button onclick={on_logout} class="text-gray-600 dark:text-gray-300">
                    { tr(&language, "logout") }
                </button>
            </div>
        }
    });

    html! {
        <div class="p-4 bg-gray-50 dark:bg-gray-800 border-b border-gray-200 dark:border-gray-700 flex justify-between items-center">
            <span class="font-bold text-gray-900 dark:text-gray-100">{ props.app_name.clone() }</span>
            { for controls }
        </div>
    }
}

#[function_component(Notifications)]
fn notifications(props: &ShellProps) -> Html {
    let shell = props.shell.clone();
    let pending = use_watch({
        let shell = shell.clone();
        move || shell.subscribe_notifications()
    });
    let params = use_watch({
        let shell = shell.clone();
        move || shell.subscribe_parameters()
    });

    html! {
        <div class="fixed bottom-4 left-4 flex flex-col gap-2 z-50">
            { for pending.into_iter().map(|notification| {
                let on_dismiss = {
                    let shell = shell.clone();
                    let id = notification.id;
                    Callback::from(move |_: MouseEvent| shell.dismiss_notification(id))
                };
                html! {
                    <div key={notification.id} class="p-3 rounded bg-red-600 text-white shadow">
                        <strong>{ tr(&params.computed_language, &notification.header_id) }</strong>
                        <p>{ notification.message.clone() }</p>
                        <button onclick={on_dismiss} class="text-sm underline">{"×"}</button>
                    </div>
                }
            }) }
        </div>
    }
}
