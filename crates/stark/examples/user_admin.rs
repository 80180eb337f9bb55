//! User Admin Example
//!
//! Serves a stark site over in-memory users and departments.
//! Run with: cargo run -p stark --example user_admin
//! Then visit: http://localhost:3000/stark/app01/userinfo/list/
//!
//! Pages are answered as JSON (`{"template": ..., "context": ...}`), ready
//! for a template engine to pick up.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request as HyperRequest, Response as HyperResponse, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stark::{
    CustomAction, MultiDeleteAction, SearchOption, SiteConfig, StarkHandler, StarkSite,
    ViewResponse, display_checkbox, display_del, display_edit, get_choice_text,
};
use stark_orm::{Entity, EntityMeta, FieldMeta, MemoryStorage};
use stark_router::{Method, Request, Response, Router};

#[derive(Debug, Parser)]
#[command(name = "user_admin", about = "Serve a stark admin over sample data")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "STARK_ADDR", default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Path every handler is mounted under.
    #[arg(long, env = "STARK_PREFIX")]
    prefix: Option<String>,

    /// JSON file with site settings.
    #[arg(long, env = "STARK_CONFIG")]
    config: Option<PathBuf>,
}

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
        EntityMeta::new("app01", "depart")
            .verbose_name("Department")
            .field(FieldMeta::auto("id"))
            .field(FieldMeta::char("title", "Title", 32).unique())
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

fn departs() -> Vec<Depart> {
    ["IT", "Sales", "Support"]
        .into_iter()
        .zip(1..)
        .map(|(title, id)| Depart {
            id,
            title: title.to_string(),
        })
        .collect()
}

fn users() -> Vec<UserInfo> {
    let names = [
        "ann", "bob", "carl", "dora", "eve", "frank", "gina", "hugo", "iris", "joe", "kate",
        "liam", "mona", "nick", "olga", "paul", "quinn", "rosa", "sam", "tina", "ugo", "vera",
        "walt", "xena", "yuri",
    ];
    names
        .into_iter()
        .zip(1..)
        .map(|(name, id)| UserInfo {
            id,
            name: name.to_string(),
            email: format!("{name}@example.com"),
            gender: 1 + id % 2,
            depart: 1 + id % 3,
        })
        .collect()
}

fn build_site(config: SiteConfig) -> StarkSite {
    let user_storage = MemoryStorage::new()
        .with_rows(users())
        .with_related("depart", departs());

    let notify = CustomAction::new("multi_notify", "Notify selected", |_ctx, pks| {
        Box::pin(async move {
            info!(selected = pks.len(), "notifying users");
            Ok(Some(ViewResponse::Message(format!("{} users notified", pks.len()))))
        })
    });

    let users = StarkHandler::new(user_storage)
        .list_display([
            display_checkbox::<UserInfo>(),
            "name".into(),
            "email".into(),
            get_choice_text("Gender", "gender"),
            "depart".into(),
            display_edit(),
            display_del(),
        ])
        .search_list(["name", "email"])
        .search_group(SearchOption::new("gender"))
        .search_group(SearchOption::new("depart").multi())
        .action(Arc::new(MultiDeleteAction))
        .action(Arc::new(notify));

    let departments = StarkHandler::new(MemoryStorage::new().with_rows(departs()))
        .list_display(["title"])
        .order_list(["title"]);

    StarkSite::new(config)
        .register(users, None)
        .register(departments, None)
}

async fn handle_request(
    req: HyperRequest<hyper::body::Incoming>,
    router: Arc<Router>,
) -> Result<HyperResponse<Full<Bytes>>, Infallible> {
    let method = Method::parse(req.method().as_str()).unwrap_or(Method::Get);
    let target = req
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str())
        .to_string();

    let mut stark_req = Request::new(method, target);
    for (key, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            stark_req.headers.insert(key.to_string(), v.to_string());
        }
    }
    stark_req.body = req
        .collect()
        .await
        .map(|b| b.to_bytes())
        .unwrap_or_default()
        .to_vec();

    let stark_res = router.handle(stark_req).await;

    let mut builder = HyperResponse::builder().status(
        StatusCode::from_u16(stark_res.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    );
    for (key, value) in &stark_res.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    let response = builder
        .body(Full::new(Bytes::from(stark_res.body)))
        .unwrap_or_else(|_| HyperResponse::new(Full::new(Bytes::from_static(b"bad response"))));
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SiteConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => SiteConfig::default(),
    };
    if let Some(prefix) = args.prefix {
        config = config.url_prefix(prefix);
    }

    let site = build_site(config);
    let home = format!(
        "{}/app01/userinfo/list/",
        site.config().url_prefix.trim_end_matches('/')
    );
    let router = Arc::new(
        site.router()?
            .get("/", move |_| {
                let home = home.clone();
                async move { Response::redirect(home) }
            }),
    );

    let listener = TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "user admin listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let router = Arc::clone(&router);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let router = Arc::clone(&router);
                handle_request(req, router)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!(%err, "error serving connection");
            }
        });
    }
}
