use carta_api::{AuthResponse, StorefrontApi};
use carta_core::{CartaError, CartaResult};
use carta_store::{Session, SessionStore};

#[derive(Debug)]
pub struct AuthManager {
    api: StorefrontApi,
    store: SessionStore,
    session: Session,
    loading: bool,
    error: Option<String>,
}

impl AuthManager {
    pub fn new(api: StorefrontApi, store: SessionStore) -> CartaResult<Self> {
        let session = store.load()?.unwrap_or_default();

        Ok(Self {
            api,
            store,
            session,
            loading: false,
            error: None,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn login(&mut self, email: &str, password: &str) -> CartaResult<()> {
        self.sign_in(email, password, None)
    }

    pub fn register(&mut self, email: &str, password: &str, name: &str) -> CartaResult<()> {
        self.sign_in(email, password, Some(name))
    }

    // Local only; the backend has no sign-out endpoint.
    pub fn logout(&mut self) -> CartaResult<()> {
        self.session = Session::default();
        self.store.clear()
    }

    fn sign_in(
        &mut self,
        email: &str,
        password: &str,
        register_name: Option<&str>,
    ) -> CartaResult<()> {
        self.error = None;

        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            let err = CartaError::usage("email and password are required");
            self.error = Some(err.message.clone());
            return Err(err);
        }

        self.loading = true;
        let outcome = match register_name {
            Some(name) => self.api.register(email, password, name),
            None => self.api.login(email, password),
        };
        let result =
            outcome.and_then(|response| accept_auth_response(response, register_name.is_some()));
        self.loading = false;

        match result {
            Ok(session) => {
                self.session = session;
                self.store.save(&self.session)?;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.message.clone());
                Err(err)
            }
        }
    }
}

fn accept_auth_response(response: AuthResponse, registering: bool) -> CartaResult<Session> {
    let fallback = if registering {
        "registration failed"
    } else {
        "login failed"
    };

    match (response.ok, response.user) {
        (true, Some(user)) => Ok(Session::authenticated(user, response.access_token)),
        _ => Err(CartaError::auth(
            response.error.unwrap_or_else(|| fallback.to_string()),
        )),
    }
}
