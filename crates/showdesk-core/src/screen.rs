//! The boundary the UI layer talks to.
//!
//! Every action runs as a background task and reports back over a channel.
//! `check_background_tasks` applies finished actions to the single display
//! field in the order they finish, so a later completion overwrites an
//! earlier one regardless of which action was started first.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::auth::{AuthError, CredentialProvider, Session, UserIdentity};
use crate::config::Config;
use crate::graphql::{
    ClientError, GraphQlClient, GraphQlError, GraphQlRequest, GraphQlResponse, OperationKind,
};
use crate::shows::{self, Show, DELETE_SHOW_FIELD, GET_SHOW_FIELD};

/// Buffer size for the action result channel
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Credentials the sign-in action submits.
#[derive(Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of one finished action.
#[derive(Debug)]
pub enum ActionResult {
    SignedIn(Result<Session, AuthError>),
    SignedOut(Result<(), AuthError>),
    Identity(Result<UserIdentity, AuthError>),
    Operation {
        kind: OperationKind,
        result: Result<GraphQlResponse, ClientError>,
    },
    /// The show plus any field errors that came back alongside it
    Show {
        kind: OperationKind,
        result: Result<(Show, Vec<GraphQlError>), ClientError>,
    },
}

pub struct Screen {
    provider: Arc<CredentialProvider>,
    client: GraphQlClient,
    pub login: LoginForm,

    // Background task channel
    result_rx: mpsc::Receiver<ActionResult>,
    result_tx: mpsc::Sender<ActionResult>,

    /// Last user-visible outcome
    pub status_message: String,
}

impl Screen {
    pub fn new(provider: Arc<CredentialProvider>, client: GraphQlClient, login: LoginForm) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            provider,
            client,
            login,
            result_rx: rx,
            result_tx: tx,
            status_message: String::new(),
        }
    }

    /// Wire a credential provider and GraphQL client from configuration.
    pub fn from_config(config: Arc<Config>, login: LoginForm) -> anyhow::Result<Self> {
        let provider = Arc::new(CredentialProvider::configure(Arc::clone(&config))?);
        let client = GraphQlClient::new(config, provider.clone())?;
        Ok(Self::new(provider, client, login))
    }

    pub fn provider(&self) -> &Arc<CredentialProvider> {
        &self.provider
    }

    pub fn display(&self) -> &str {
        &self.status_message
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    pub fn sign_in(&self) -> JoinHandle<()> {
        let provider = Arc::clone(&self.provider);
        let login = self.login.clone();
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = provider.sign_in(&login.username, &login.password).await;
            Self::send_result(&tx, ActionResult::SignedIn(result)).await;
        })
    }

    pub fn sign_out(&self) -> JoinHandle<()> {
        let provider = Arc::clone(&self.provider);
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = provider.sign_out().await;
            Self::send_result(&tx, ActionResult::SignedOut(result)).await;
        })
    }

    pub fn who_am_i(&self) -> JoinHandle<()> {
        let provider = Arc::clone(&self.provider);
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = provider.current_user().await;
            Self::send_result(&tx, ActionResult::Identity(result)).await;
        })
    }

    pub fn run_query(&self, document: impl Into<String>, variables: Map<String, Value>) -> JoinHandle<()> {
        self.spawn_operation(GraphQlRequest::with_variables(document, variables), OperationKind::Query)
    }

    pub fn run_mutation(&self, document: impl Into<String>, variables: Map<String, Value>) -> JoinHandle<()> {
        self.spawn_operation(
            GraphQlRequest::with_variables(document, variables),
            OperationKind::Mutation,
        )
    }

    pub fn load_show(&self, id: &str) -> JoinHandle<()> {
        self.spawn_show(shows::load_show(id), OperationKind::Query, GET_SHOW_FIELD)
    }

    pub fn delete_show(&self, id: i64) -> JoinHandle<()> {
        self.spawn_show(shows::delete_show(id), OperationKind::Mutation, DELETE_SHOW_FIELD)
    }

    fn spawn_operation(&self, request: GraphQlRequest, kind: OperationKind) -> JoinHandle<()> {
        let client = self.client.clone();
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = client.execute(&request, kind).await;
            Self::send_result(&tx, ActionResult::Operation { kind, result }).await;
        })
    }

    fn spawn_show(&self, request: GraphQlRequest, kind: OperationKind, field: &'static str) -> JoinHandle<()> {
        let client = self.client.clone();
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = client
                .execute(&request, kind)
                .await
                .and_then(|response| {
                    let show = response.field_as::<Show>(field)?;
                    Ok((show, response.errors))
                });
            Self::send_result(&tx, ActionResult::Show { kind, result }).await;
        })
    }

    async fn send_result(tx: &mpsc::Sender<ActionResult>, result: ActionResult) {
        if tx.send(result).await.is_err() {
            warn!("Screen dropped before action result was delivered");
        }
    }

    // =========================================================================
    // Display state
    // =========================================================================

    /// Apply every finished action, returning how many were applied
    pub fn check_background_tasks(&mut self) -> usize {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }

        let count = results.len();
        for result in results {
            self.process_result(result);
        }
        count
    }

    /// Wait for the next action to finish and apply it.
    pub async fn next_result(&mut self) -> &str {
        if let Some(result) = self.result_rx.recv().await {
            self.process_result(result);
        }
        &self.status_message
    }

    fn process_result(&mut self, result: ActionResult) {
        debug!(?result, "Action finished");
        self.status_message = Self::describe(&result);
    }

    /// Turn an action outcome into the text shown to the user.
    pub fn describe(result: &ActionResult) -> String {
        match result {
            ActionResult::SignedIn(Ok(session)) => format!("logged in {}", session.username),
            ActionResult::SignedIn(Err(e)) => match e {
                AuthError::InvalidCredentials => "login failed: invalid username or password".to_string(),
                AuthError::NetworkFailure(_) => {
                    "login failed: unable to reach the identity service".to_string()
                }
                AuthError::ServiceError(msg) => format!("login failed: {}", msg),
                AuthError::NotSignedIn => "login failed".to_string(),
            },
            ActionResult::SignedOut(Ok(())) => "logged out".to_string(),
            ActionResult::SignedOut(Err(e)) => {
                format!("logged out locally, identity service sign-out failed: {}", e)
            }
            ActionResult::Identity(Ok(user)) => {
                format!("signed in as {} ({})", user.username, user.user_id)
            }
            ActionResult::Identity(Err(e)) => Self::describe_auth_error(e),
            ActionResult::Operation { result: Ok(response), .. } => Self::describe_response(response),
            ActionResult::Operation { result: Err(e), .. } => Self::describe_client_error(e),
            ActionResult::Show { result: Ok((show, errors)), .. } => match errors.first() {
                Some(first) => format!("{} (partial data: {})", show.s_name, first.message),
                None => show.s_name.clone(),
            },
            ActionResult::Show { result: Err(e), .. } => Self::describe_client_error(e),
        }
    }

    fn describe_response(response: &GraphQlResponse) -> String {
        match (response.errors.first(), &response.data) {
            (Some(first), Some(_)) => format!("{} (partial data)", first.message),
            (Some(first), None) => first.message.clone(),
            (None, Some(data)) => data.to_string(),
            (None, None) => String::new(),
        }
    }

    fn describe_auth_error(e: &AuthError) -> String {
        match e {
            AuthError::NotSignedIn | AuthError::InvalidCredentials => "please sign in".to_string(),
            AuthError::NetworkFailure(_) => "unable to reach the identity service".to_string(),
            AuthError::ServiceError(msg) => msg.clone(),
        }
    }

    fn describe_client_error(e: &ClientError) -> String {
        match e {
            ClientError::Unauthenticated(_) => "please sign in".to_string(),
            ClientError::Transport(_) => {
                "unable to reach the server, check your connection".to_string()
            }
            ClientError::GraphQl(errors) => errors
                .first()
                .map(|err| err.message.clone())
                .unwrap_or_else(|| e.to_string()),
            ClientError::InvalidResponse(msg) => format!("unexpected server response: {}", msg),
        }
    }
}
