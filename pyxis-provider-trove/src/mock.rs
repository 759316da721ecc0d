//! Scripted `DbApi` implementation for adapter tests.
//!
//! Each endpoint has a queue of canned results consumed in order, plus an
//! optional fallback returned once the queue runs dry (for polls that repeat
//! until a timeout). Calls with neither scripted results nor a fallback
//! panic, so a test cannot silently poll something it did not script.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::DbApi;
use crate::error::TroveResult;
use crate::types::{
    Configuration, ConfigurationCreate, Database, DatabaseCreate, Instance, InstanceCreate, User,
    UserCreate,
};

#[derive(Default)]
pub struct ScriptedApi {
    pub created_instances: Mutex<Vec<InstanceCreate>>,
    pub created_databases: Mutex<Vec<(String, Vec<DatabaseCreate>)>>,
    pub created_users: Mutex<Vec<(String, Vec<UserCreate>)>>,
    pub created_configurations: Mutex<Vec<ConfigurationCreate>>,
    pub deleted: Mutex<Vec<String>>,

    create_instance_results: Mutex<VecDeque<TroveResult<Instance>>>,
    get_instance_results: Mutex<VecDeque<TroveResult<Instance>>>,
    get_instance_fallback: Mutex<Option<Instance>>,
    delete_instance_results: Mutex<VecDeque<TroveResult<()>>>,

    create_databases_results: Mutex<VecDeque<TroveResult<()>>>,
    list_databases_results: Mutex<VecDeque<TroveResult<Vec<Database>>>>,
    list_databases_fallback: Mutex<Option<Vec<Database>>>,
    delete_database_results: Mutex<VecDeque<TroveResult<()>>>,

    create_users_results: Mutex<VecDeque<TroveResult<()>>>,
    list_users_results: Mutex<VecDeque<TroveResult<Vec<User>>>>,
    list_users_fallback: Mutex<Option<Vec<User>>>,
    delete_user_results: Mutex<VecDeque<TroveResult<()>>>,

    create_configuration_results: Mutex<VecDeque<TroveResult<Configuration>>>,
    get_configuration_results: Mutex<VecDeque<TroveResult<Configuration>>>,
    delete_configuration_results: Mutex<VecDeque<TroveResult<()>>>,
}

fn take<T: Clone>(
    queue: &Mutex<VecDeque<TroveResult<T>>>,
    fallback: &Mutex<Option<T>>,
    what: &str,
) -> TroveResult<T> {
    if let Some(result) = queue.lock().unwrap().pop_front() {
        return result;
    }
    if let Some(value) = fallback.lock().unwrap().clone() {
        return Ok(value);
    }
    panic!("unscripted {what} call");
}

fn take_only<T>(queue: &Mutex<VecDeque<TroveResult<T>>>, what: &str) -> TroveResult<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| panic!("unscripted {what} call"))
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_create_instance(&self, result: TroveResult<Instance>) {
        self.create_instance_results.lock().unwrap().push_back(result);
    }

    pub fn script_get_instance(&self, result: TroveResult<Instance>) {
        self.get_instance_results.lock().unwrap().push_back(result);
    }

    pub fn fallback_get_instance(&self, instance: Instance) {
        *self.get_instance_fallback.lock().unwrap() = Some(instance);
    }

    pub fn script_delete_instance(&self, result: TroveResult<()>) {
        self.delete_instance_results.lock().unwrap().push_back(result);
    }

    pub fn script_create_databases(&self, result: TroveResult<()>) {
        self.create_databases_results.lock().unwrap().push_back(result);
    }

    pub fn script_list_databases(&self, result: TroveResult<Vec<Database>>) {
        self.list_databases_results.lock().unwrap().push_back(result);
    }

    pub fn fallback_list_databases(&self, databases: Vec<Database>) {
        *self.list_databases_fallback.lock().unwrap() = Some(databases);
    }

    pub fn script_delete_database(&self, result: TroveResult<()>) {
        self.delete_database_results.lock().unwrap().push_back(result);
    }

    pub fn script_create_users(&self, result: TroveResult<()>) {
        self.create_users_results.lock().unwrap().push_back(result);
    }

    pub fn script_list_users(&self, result: TroveResult<Vec<User>>) {
        self.list_users_results.lock().unwrap().push_back(result);
    }

    pub fn fallback_list_users(&self, users: Vec<User>) {
        *self.list_users_fallback.lock().unwrap() = Some(users);
    }

    pub fn script_delete_user(&self, result: TroveResult<()>) {
        self.delete_user_results.lock().unwrap().push_back(result);
    }

    pub fn script_create_configuration(&self, result: TroveResult<Configuration>) {
        self.create_configuration_results
            .lock()
            .unwrap()
            .push_back(result);
    }

    pub fn script_get_configuration(&self, result: TroveResult<Configuration>) {
        self.get_configuration_results.lock().unwrap().push_back(result);
    }

    pub fn script_delete_configuration(&self, result: TroveResult<()>) {
        self.delete_configuration_results
            .lock()
            .unwrap()
            .push_back(result);
    }
}

#[async_trait]
impl DbApi for ScriptedApi {
    async fn create_instance(&self, body: &InstanceCreate) -> TroveResult<Instance> {
        self.created_instances.lock().unwrap().push(body.clone());
        take_only(&self.create_instance_results, "create_instance")
    }

    async fn get_instance(&self, _id: &str) -> TroveResult<Instance> {
        take(
            &self.get_instance_results,
            &self.get_instance_fallback,
            "get_instance",
        )
    }

    async fn delete_instance(&self, id: &str) -> TroveResult<()> {
        self.deleted.lock().unwrap().push(format!("instance/{id}"));
        take_only(&self.delete_instance_results, "delete_instance")
    }

    async fn create_databases(
        &self,
        instance_id: &str,
        databases: &[DatabaseCreate],
    ) -> TroveResult<()> {
        self.created_databases
            .lock()
            .unwrap()
            .push((instance_id.to_string(), databases.to_vec()));
        take_only(&self.create_databases_results, "create_databases")
    }

    async fn list_databases(&self, _instance_id: &str) -> TroveResult<Vec<Database>> {
        take(
            &self.list_databases_results,
            &self.list_databases_fallback,
            "list_databases",
        )
    }

    async fn delete_database(&self, instance_id: &str, name: &str) -> TroveResult<()> {
        self.deleted
            .lock()
            .unwrap()
            .push(format!("database/{instance_id}/{name}"));
        take_only(&self.delete_database_results, "delete_database")
    }

    async fn create_users(&self, instance_id: &str, users: &[UserCreate]) -> TroveResult<()> {
        self.created_users
            .lock()
            .unwrap()
            .push((instance_id.to_string(), users.to_vec()));
        take_only(&self.create_users_results, "create_users")
    }

    async fn list_users(&self, _instance_id: &str) -> TroveResult<Vec<User>> {
        take(
            &self.list_users_results,
            &self.list_users_fallback,
            "list_users",
        )
    }

    async fn delete_user(&self, instance_id: &str, name: &str) -> TroveResult<()> {
        self.deleted
            .lock()
            .unwrap()
            .push(format!("user/{instance_id}/{name}"));
        take_only(&self.delete_user_results, "delete_user")
    }

    async fn create_configuration(&self, body: &ConfigurationCreate) -> TroveResult<Configuration> {
        self.created_configurations.lock().unwrap().push(body.clone());
        take_only(&self.create_configuration_results, "create_configuration")
    }

    async fn get_configuration(&self, _id: &str) -> TroveResult<Configuration> {
        take_only(&self.get_configuration_results, "get_configuration")
    }

    async fn delete_configuration(&self, id: &str) -> TroveResult<()> {
        self.deleted
            .lock()
            .unwrap()
            .push(format!("configuration/{id}"));
        take_only(&self.delete_configuration_results, "delete_configuration")
    }
}
