//! Example: modular service registration.
//!
//! Demonstrates organizing registrations into small functions ("modules")
//! that each take `&Container` and wire up one area of the application.

use ctxdi::{Container, DiResult, Scope, Token};
use std::sync::Arc;

// ===== Shared configuration =====

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub api_key: String,
    pub max_connections: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost:5432/app".to_string(),
            api_key: "dev-api-key".to_string(),
            max_connections: 10,
        }
    }
}

fn config_token() -> Token {
    Token::for_type::<AppConfig>("app-config", Scope::Singleton)
}

// ===== Database module =====

#[derive(Debug)]
pub struct Database {
    pub connection_string: String,
    pub max_connections: usize,
}

impl Database {
    pub fn connect(&self) -> String {
        format!("Connected to {}", self.connection_string)
    }
}

fn database_token() -> Token {
    Token::for_type::<Database>("database", Scope::Singleton)
}

/// Registers the database service. Singleton: one pool for the whole
/// container's lifetime.
fn database_module(c: &Container) {
    let cfg_token = config_token();
    c.register_singleton(database_token(), {
        let c = c.clone();
        move || {
            let config: Arc<AppConfig> = c.get_token(&cfg_token)?;
            Ok(Database {
                connection_string: config.database_url.clone(),
                max_connections: config.max_connections,
            })
        }
    });
}

// ===== User module =====

#[derive(Debug)]
pub struct UserRepository {
    pub database: Arc<Database>,
}

impl UserRepository {
    pub fn find_user(&self, id: u32) -> String {
        format!("User {} from {}", id, self.database.connect())
    }
}

#[derive(Debug)]
pub struct UserService {
    pub repository: Arc<UserRepository>,
}

impl UserService {
    pub fn get_user_profile(&self, id: u32) -> String {
        format!("Profile: {}", self.repository.find_user(id))
    }
}

fn user_repository_token() -> Token {
    Token::for_type::<UserRepository>("user-repository", Scope::Request)
}

fn user_service_token() -> Token {
    Token::for_type::<UserService>("user-service", Scope::Transient)
}

/// Registers the user repository (request-scoped — one per inbound
/// request) and the user service (transient — cheap to rebuild each
/// call since it only wraps the repository `Arc`).
fn user_module(c: &Container) {
    let db_token = database_token();
    c.register_request(user_repository_token(), {
        let c = c.clone();
        move || {
            let database: Arc<Database> = c.get_token(&db_token)?;
            Ok(UserRepository { database })
        }
    });

    let repo_token = user_repository_token();
    c.register_transient(user_service_token(), {
        let c = c.clone();
        move || {
            let repository: Arc<UserRepository> = c.get_token(&repo_token)?;
            Ok(UserService { repository })
        }
    });
}

// ===== API module =====

#[derive(Debug)]
pub struct ApiClient {
    pub api_key: String,
}

impl ApiClient {
    pub fn call_api(&self) -> String {
        format!("API call with key: {}", self.api_key)
    }
}

fn api_client_token() -> Token {
    Token::for_type::<ApiClient>("api-client", Scope::Singleton)
}

fn api_module(c: &Container) {
    let cfg_token = config_token();
    c.register_singleton(api_client_token(), {
        let c = c.clone();
        move || {
            let config: Arc<AppConfig> = c.get_token(&cfg_token)?;
            Ok(ApiClient { api_key: config.api_key.clone() })
        }
    });
}

// ===== App module (uses everything) =====

#[derive(Debug)]
pub struct AppService {
    pub user_service: Arc<UserService>,
    pub api_client: Arc<ApiClient>,
}

impl AppService {
    pub fn process_request(&self, user_id: u32) -> String {
        let user_profile = self.user_service.get_user_profile(user_id);
        let api_result = self.api_client.call_api();
        format!("{} | {}", user_profile, api_result)
    }
}

fn app_service_token() -> Token {
    Token::for_type::<AppService>("app-service", Scope::Request)
}

fn app_module(c: &Container) {
    let user_token = user_service_token();
    let api_token = api_client_token();
    c.register_request(app_service_token(), {
        let c = c.clone();
        move || {
            let user_service: Arc<UserService> = c.get_token(&user_token)?;
            let api_client: Arc<ApiClient> = c.get_token(&api_token)?;
            Ok(AppService { user_service, api_client })
        }
    });
}

/// Wires up every module onto a freshly configured container.
fn build_container(config: AppConfig) -> Container {
    let container = Container::new();
    container.register_value(config_token(), config);
    database_module(&container);
    user_module(&container);
    api_module(&container);
    app_module(&container);
    container
}

fn main() -> DiResult<()> {
    println!("=== ctxdi Modular Registration Example ===\n");

    println!("1. Default configuration:");
    let container = build_container(AppConfig::default());
    container.request_scope(|c| {
        let app_service = c.get_token::<AppService>(&app_service_token())?;
        println!("   Result: {}\n", app_service.process_request(123));
        Ok(())
    })?;

    println!("2. Overridden configuration, fresh request scope:");
    let container2 = build_container(AppConfig {
        database_url: "sqlite:///tmp/app.db".to_string(),
        api_key: "prod-api-key".to_string(),
        max_connections: 5,
    });
    container2.request_scope(|c| {
        let app_service = c.get_token::<AppService>(&app_service_token())?;
        println!("   Result: {}\n", app_service.process_request(456));
        Ok(())
    })?;

    println!("3. A second request scope gets its own AppService/UserRepository:");
    container2.request_scope(|c| {
        let a = c.get_token::<AppService>(&app_service_token())?;
        let b = c.get_token::<AppService>(&app_service_token())?;
        assert!(Arc::ptr_eq(&a, &b), "same request scope shares the instance");
        Ok(())
    })?;

    Ok(())
}
