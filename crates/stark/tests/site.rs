//! End-to-end tests: a full router over in-memory storage.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stark::{
    CustomAction, EntityHandler, MultiDeleteAction, RequestContext, SearchOption, SiteConfig,
    StarkError, StarkHandler, StarkSite, ViewResponse, display_checkbox, display_del,
    display_edit, get_choice_text,
};
use stark_forms::BoundForm;
use stark_orm::{BoxFuture, Entity, EntityMeta, FieldMeta, MemoryStorage, QuerySet, Storage};
use stark_router::{Request, Response, Router};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Depart {
    id: i64,
    title: String,
}

impl fmt::Display for Depart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

impl Entity for Depart {
    fn meta() -> EntityMeta {
        EntityMeta::new("app01", "depart").field(FieldMeta::char("title", "Title", 32))
    }

    fn pk(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserInfo {
    id: i64,
    name: String,
    email: String,
    gender: i64,
    depart: i64,
}

impl fmt::Display for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Entity for UserInfo {
    fn meta() -> EntityMeta {
        EntityMeta::new("app01", "userinfo")
            .verbose_name("User")
            .field(FieldMeta::auto("id"))
            .field(FieldMeta::char("name", "Name", 32))
            .field(FieldMeta::email("email", "Email").unique())
            .field(FieldMeta::choices("gender", "Gender", [(1, "Male"), (2, "Female")]))
            .field(FieldMeta::foreign_key("depart", "Department", "depart"))
    }

    fn pk(&self) -> i64 {
        self.id
    }
}

fn user(id: i64, name: &str, email: &str, gender: i64) -> UserInfo {
    UserInfo {
        id,
        name: name.to_string(),
        email: email.to_string(),
        gender,
        depart: 1 + id % 2,
    }
}

fn storage(users: impl IntoIterator<Item = UserInfo>) -> Arc<MemoryStorage<UserInfo>> {
    Arc::new(
        MemoryStorage::new().with_rows(users).with_related(
            "depart",
            [
                Depart { id: 1, title: "IT".into() },
                Depart { id: 2, title: "Sales".into() },
            ],
        ),
    )
}

fn many_users() -> Arc<MemoryStorage<UserInfo>> {
    storage((1..=25).map(|id| user(id, &format!("user{id}"), &format!("u{id}@example.com"), 1)))
}

fn few_users() -> Arc<MemoryStorage<UserInfo>> {
    storage([
        user(1, "ann", "ann@example.com", 2),
        user(2, "bob", "joanna@example.com", 1),
        user(3, "carl", "carl@example.com", 1),
        user(4, "dave", "d@example.com", 2),
    ])
}

fn handler(storage: &Arc<MemoryStorage<UserInfo>>) -> StarkHandler<UserInfo> {
    StarkHandler::<UserInfo>::shared(Arc::clone(storage) as Arc<dyn Storage<UserInfo>>)
        .list_display([
            display_checkbox::<UserInfo>(),
            "name".into(),
            "email".into(),
            get_choice_text("Gender", "gender"),
            display_edit(),
            display_del(),
        ])
        .search_list(["name", "email"])
        .search_group(SearchOption::new("gender"))
        .search_group(SearchOption::new("depart").multi())
        .action(Arc::new(MultiDeleteAction))
}

fn router(handler: StarkHandler<UserInfo>) -> Router {
    StarkSite::new(SiteConfig::default())
        .register(handler, None)
        .router()
        .unwrap()
}

fn json(response: &Response) -> Value {
    serde_json::from_str(&response.body_string().unwrap()).unwrap()
}

fn pks(body: &Value) -> Vec<i64> {
    body["context"]["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["pk"].as_i64().unwrap())
        .collect()
}

const LIST: &str = "/stark/app01/userinfo/list/";

#[tokio::test]
async fn test_third_page_of_25() {
    let storage = many_users();
    let router = router(handler(&storage));

    let response = router.handle(Request::get(format!("{LIST}?page=3"))).await;
    assert_eq!(response.status, 200);
    let body = json(&response);
    assert_eq!(body["template"], "stark/data_list.html");

    let pager = &body["context"]["pager"];
    assert_eq!(pager["total_pages"], 3);
    assert_eq!(pager["start"], 20);
    assert_eq!(pager["end"], 25);
    // Newest first: the last page holds the five oldest rows.
    assert_eq!(pks(&body), vec![5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn test_page_out_of_range_clamps() {
    let storage = many_users();
    let router = router(handler(&storage));

    let body = json(&router.handle(Request::get(format!("{LIST}?page=40"))).await);
    assert_eq!(body["context"]["pager"]["current_page"], 3);

    let body = json(&router.handle(Request::get(format!("{LIST}?page=x"))).await);
    assert_eq!(body["context"]["pager"]["current_page"], 1);
    assert_eq!(pks(&body).len(), 10);
}

#[tokio::test]
async fn test_headers_and_cells() {
    let storage = few_users();
    let router = router(handler(&storage));

    let body = json(&router.handle(Request::get(LIST)).await);
    let headers: Vec<&str> = body["context"]["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h.as_str().unwrap())
        .collect();
    assert_eq!(headers, ["Select", "Name", "Email", "Gender", "Edit", "Delete"]);

    let first = &body["context"]["rows"][0];
    assert_eq!(first["pk"], 4);
    assert_eq!(first["cells"][1]["value"], "dave");
    assert_eq!(first["cells"][3]["value"], "Female");
    assert_eq!(first["cells"][4]["kind"], "html");
    assert!(
        first["cells"][4]["value"]
            .as_str()
            .unwrap()
            .contains("/stark/app01/userinfo/edit/4/")
    );
    assert!(body["context"]["add_btn"].as_str().unwrap().contains("/stark/app01/userinfo/add/"));
}

#[tokio::test]
async fn test_no_columns_shows_display_string() {
    let storage = few_users();
    let plain =
        StarkHandler::<UserInfo>::shared(Arc::clone(&storage) as Arc<dyn Storage<UserInfo>>)
            .has_add_btn(false);
    let body = json(&router(plain).handle(Request::get(LIST)).await);

    assert_eq!(body["context"]["headers"], serde_json::json!(["User"]));
    assert_eq!(body["context"]["rows"][0]["cells"][0]["value"], "dave");
    assert!(body["context"]["add_btn"].is_null());
}

#[tokio::test]
async fn test_search_ors_name_and_email() {
    let storage = few_users();
    let router = router(handler(&storage));

    let body = json(&router.handle(Request::get(format!("{LIST}?q=ann"))).await);
    assert_eq!(pks(&body), vec![2, 1]);
    assert_eq!(body["context"]["search_value"], "ann");

    let body = json(&router.handle(Request::get(format!("{LIST}?q="))).await);
    assert_eq!(pks(&body).len(), 4);
}

#[tokio::test]
async fn test_search_group_filters_and_toggles() {
    let storage = few_users();
    let router = router(handler(&storage));

    let body = json(&router.handle(Request::get(format!("{LIST}?gender=2"))).await);
    assert_eq!(pks(&body), vec![4, 1]);

    let gender = &body["context"]["search_group"][0];
    assert_eq!(gender["title"], "Gender");
    assert_eq!(gender["all"]["selected"], false);
    assert_eq!(gender["options"][1]["selected"], true);
    assert_eq!(gender["options"][1]["url"], LIST);
    assert_eq!(gender["options"][0]["url"], format!("{LIST}?gender=1"));

    let depart = &body["context"]["search_group"][1];
    assert_eq!(depart["options"][0]["label"], "IT");
    assert_eq!(depart["options"][1]["url"], format!("{LIST}?gender=2&depart=2"));

    let body = json(&router.handle(Request::get(format!("{LIST}?depart=1&depart=2"))).await);
    assert_eq!(pks(&body).len(), 4);
}

#[tokio::test]
async fn test_filter_round_trip() {
    let storage = few_users();
    let router = router(handler(&storage));

    // The edit link of a filtered list carries the list query.
    let body = json(&router.handle(Request::get(format!("{LIST}?q=ann&page=1"))).await);
    let link = body["context"]["rows"][0]["cells"][4]["value"].as_str().unwrap().to_string();
    assert!(link.contains("edit/2/?_filter=q%3Dann%26page%3D1"));

    let edit = "/stark/app01/userinfo/edit/2/?_filter=q%3Dann%26page%3D1";
    let body = json(&router.handle(Request::get(edit)).await);
    assert_eq!(body["template"], "stark/change.html");
    assert_eq!(body["context"]["cancel_url"], format!("{LIST}?q=ann&page=1"));

    let response = router
        .handle(Request::post(edit).form_body(&[
            ("name", "bobby"),
            ("email", "joanna@example.com"),
            ("gender", "1"),
            ("depart", "1"),
        ]))
        .await;
    assert!(response.is_redirect());
    assert_eq!(response.location(), Some(format!("{LIST}?q=ann&page=1").as_str()));

    let saved = storage.get(2).await.unwrap().unwrap();
    assert_eq!(saved.name, "bobby");
    assert_eq!(saved.depart, 1);
}

#[tokio::test]
async fn test_add_creates_and_redirects() {
    let storage = few_users();
    let router = router(handler(&storage));

    let response = router
        .handle(Request::post("/stark/app01/userinfo/add/").form_body(&[
            ("name", "eve"),
            ("email", "eve@example.com"),
            ("gender", "2"),
            ("depart", "2"),
        ]))
        .await;
    assert!(response.is_redirect());
    assert_eq!(response.location(), Some(LIST));
    assert_eq!(storage.len(), 5);

    let eve = storage.get(5).await.unwrap().unwrap();
    assert_eq!((eve.name.as_str(), eve.gender, eve.depart), ("eve", 2, 2));
}

#[tokio::test]
async fn test_invalid_form_rerenders() {
    let storage = few_users();
    let router = router(handler(&storage));

    let response = router
        .handle(Request::post("/stark/app01/userinfo/add/").form_body(&[
            ("name", ""),
            ("email", "not-an-email"),
            ("gender", "7"),
        ]))
        .await;
    assert_eq!(response.status, 200);
    let body = json(&response);
    assert_eq!(body["template"], "stark/change.html");

    let fields = body["context"]["form"]["fields"].as_array().unwrap();
    let errors = |name: &str| {
        fields
            .iter()
            .find(|f| f["name"] == name)
            .map(|f| f["errors"].as_array().unwrap().len())
            .unwrap()
    };
    assert_eq!(errors("name"), 1);
    assert_eq!(errors("email"), 1);
    assert_eq!(errors("gender"), 1);
    assert_eq!(storage.len(), 4);
}

#[tokio::test]
async fn test_storage_rejection_is_folded_into_form() {
    let storage = few_users();
    let router = router(handler(&storage));

    let response = router
        .handle(Request::post("/stark/app01/userinfo/add/").form_body(&[
            ("name", "ann2"),
            ("email", "ann@example.com"),
            ("gender", "2"),
            ("depart", "1"),
        ]))
        .await;
    let body = json(&response);
    assert_eq!(body["template"], "stark/change.html");
    let email = body["context"]["form"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "email")
        .unwrap()
        .clone();
    assert_eq!(email["errors"][0], "User with this Email already exists.");
    assert_eq!(storage.len(), 4);
}

#[tokio::test]
async fn test_get_never_mutates() {
    let storage = few_users();
    let router = router(handler(&storage));

    for path in [
        "/stark/app01/userinfo/add/",
        "/stark/app01/userinfo/edit/1/",
        "/stark/app01/userinfo/delete/1/",
        "/stark/app01/userinfo/delete/1/?pk=2&action=multi_delete",
    ] {
        let response = router.handle(Request::get(path)).await;
        assert_eq!(response.status, 200, "{path}");
    }
    assert_eq!(storage.len(), 4);

    let body = json(&router.handle(Request::get("/stark/app01/userinfo/delete/1/")).await);
    assert_eq!(body["template"], "stark/delete.html");
    assert_eq!(body["context"]["object"], "ann");
    assert_eq!(body["context"]["cancel_url"], LIST);
}

#[tokio::test]
async fn test_delete_confirms_then_removes() {
    let storage = few_users();
    let router = router(handler(&storage));

    let response = router
        .handle(Request::post("/stark/app01/userinfo/delete/3/?_filter=q%3Dc"))
        .await;
    assert_eq!(response.location(), Some(format!("{LIST}?q=c").as_str()));
    assert!(storage.get(3).await.unwrap().is_none());
    assert_eq!(storage.len(), 3);
}

#[tokio::test]
async fn test_missing_object_is_a_message() {
    let storage = few_users();
    let router = router(handler(&storage));

    for path in [
        "/stark/app01/userinfo/edit/999/",
        "/stark/app01/userinfo/delete/999/",
        "/stark/app01/userinfo/edit/abc/",
    ] {
        let response = router.handle(Request::get(path)).await;
        assert_eq!(response.status, 200, "{path}");
        assert!(!response.is_redirect());
        assert!(response.body_string().unwrap().contains("does not exist"));

        let response = router.handle(Request::post(path).form_body(&[("name", "x")])).await;
        assert!(response.body_string().unwrap().contains("does not exist"));
    }
    assert_eq!(storage.len(), 4);
}

/// Deletes the edited row right before saving it, as a concurrent request
/// would.
struct DeleteBeforeSave {
    storage: Arc<MemoryStorage<UserInfo>>,
}

impl EntityHandler for DeleteBeforeSave {
    type Entity = UserInfo;

    fn storage(&self) -> &dyn Storage<UserInfo> {
        self.storage.as_ref()
    }

    fn save<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        form: &'a BoundForm,
        existing: Option<&'a UserInfo>,
    ) -> BoxFuture<'a, stark::Result<UserInfo>> {
        Box::pin(async move {
            if let Some(obj) = existing {
                self.storage.delete(&[obj.pk()]).await?;
            }
            Ok(self.storage.save(form.cleaned_data(), existing).await?)
        })
    }
}

#[tokio::test]
async fn test_edit_of_vanished_row_is_a_message() {
    let storage = few_users();
    let router = StarkSite::new(SiteConfig::default())
        .register(
            DeleteBeforeSave {
                storage: Arc::clone(&storage),
            },
            None,
        )
        .router()
        .unwrap();

    let response = router
        .handle(Request::post("/stark/app01/userinfo/edit/2/").form_body(&[
            ("name", "bobby"),
            ("email", "bobby@example.com"),
            ("gender", "1"),
            ("depart", "1"),
        ]))
        .await;
    assert!(!response.is_redirect());
    assert!(response.body_string().unwrap().contains("does not exist"));
    assert!(storage.get(2).await.unwrap().is_none());
    assert_eq!(storage.len(), 3);

    let response = router
        .handle(Request::post("/stark/app01/userinfo/add/").form_body(&[
            ("name", "eve"),
            ("email", "eve@example.com"),
            ("gender", "2"),
            ("depart", "2"),
        ]))
        .await;
    assert!(response.is_redirect());
    assert_eq!(storage.get(5).await.unwrap().unwrap().name, "eve");
    assert_eq!(storage.get(4).await.unwrap().unwrap().name, "dave");
}

#[tokio::test]
async fn test_known_action_runs() {
    let storage = few_users();
    let router = router(handler(&storage));

    let response = router
        .handle(Request::post(LIST).form_body(&[
            ("action", "multi_delete"),
            ("pk", "1"),
            ("pk", "3"),
        ]))
        .await;
    let body = json(&response);
    assert_eq!(pks(&body), vec![4, 2]);
    assert!(body["context"]["action_error"].is_null());
    assert_eq!(body["context"]["action_dict"][0]["name"], "multi_delete");
}

#[tokio::test]
async fn test_unknown_action_is_rejected() {
    let storage = few_users();
    let router = router(handler(&storage));

    let response = router
        .handle(Request::post(LIST).form_body(&[("action", "__init__"), ("pk", "1")]))
        .await;
    assert_eq!(response.status, 200);
    let body = json(&response);
    assert_eq!(body["context"]["action_error"], "unknown action: __init__");
    assert_eq!(pks(&body).len(), 4);
    assert_eq!(storage.len(), 4);
}

#[tokio::test]
async fn test_custom_action_runs_once_and_responds() {
    let storage = few_users();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let action = CustomAction::new("multi_init", "Initialize", move |_ctx, pks| {
        let seen = Arc::clone(&seen);
        Box::pin(async move {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(Some(ViewResponse::Redirect(format!("/done/?n={}", pks.len()))))
        })
    });
    let router = router(handler(&storage).action(Arc::new(action)));

    let response = router
        .handle(Request::post(LIST).form_body(&[
            ("action", "multi_init"),
            ("pk", "2"),
            ("pk", "4"),
        ]))
        .await;
    assert_eq!(response.location(), Some("/done/?n=2"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(storage.count(&QuerySet::new()).await.unwrap(), 4);
}

#[test]
fn test_registering_twice_fails_at_build() {
    let storage = few_users();
    let site = StarkSite::default()
        .register(handler(&storage), None)
        .register(handler(&storage), None);
    assert!(matches!(site.build_routes(), Err(StarkError::DuplicateUrlName(_))));

    let site = StarkSite::default()
        .register(handler(&storage), None)
        .register(handler(&storage), Some("private"));
    assert!(site.build_routes().is_ok());
}
