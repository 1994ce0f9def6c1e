use actix_files::Files;
use actix_identity::Identity;
use actix_multipart::form::{bytes::Bytes as UploadedFile, MultipartForm, MultipartFormConfig};
use actix_session::Session;
use actix_web::{
    get,
    http::{header, Method, StatusCode},
    post,
    web::{self, Data, Form, Path, Query},
    HttpMessage, HttpRequest, HttpResponse,
};
use chrono::Datelike;
use serde::Deserialize;
use tera::Context;

use crate::{
    auth::{AdminUser, CurrentUser},
    db,
    errors::AppError,
    flash::{self, Level},
    forms::{self, ItemForm, LoginForm, RegisterForm, ScanForm, SearchForm},
    scan, search,
    structs::{FieldErrors, Role},
    transfer, utils, AppState, TEMPLATES,
};

const UPLOAD_LIMIT: usize = 8 * 1024 * 1024;

/// Registers every route plus the upload limits; shared by `main` and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        MultipartFormConfig::default()
            .total_limit(UPLOAD_LIMIT)
            .memory_limit(UPLOAD_LIMIT),
    )
    .service(Files::new("/static", "static"))
    .service(index_handler)
    .service(login_handler)
    .service(login_form_handler)
    .service(logout_handler)
    .service(register_handler)
    .service(register_form_handler)
    .service(list_items_handler)
    .service(search_items_handler)
    .service(add_item_handler)
    .service(add_item_form_handler)
    .service(update_item_handler)
    .service(update_item_form_handler)
    .service(delete_item_handler)
    .service(check_inventory_handler)
    .service(scan_in_handler)
    .service(scan_in_form_handler)
    .service(scan_out_handler)
    .service(scan_out_form_handler)
    .service(export_data_handler)
    .service(import_data_handler)
    .service(import_data_form_handler);
}

/// Context every page extends from: who is logged in, pending flashes, footer data.
fn base_context(user: Option<&CurrentUser>, session: &Session) -> Result<Context, AppError> {
    let mut context = Context::new();
    context.insert("current_user", &user);
    context.insert("flashes", &flash::take(session)?);
    context.insert("year", &chrono::Utc::now().year());
    context.insert("version", env!("CARGO_PKG_VERSION"));
    Ok(context)
}

fn render(template: &str, context: &Context) -> Result<HttpResponse, AppError> {
    let rendered = TEMPLATES.render(template, context).map_err(|e| {
        log::error!("Failed to render template: {}", e);
        AppError::TemplateError(e)
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(rendered))
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location))
        .finish()
}

/// index handler
#[get("/")]
pub async fn index_handler(user: CurrentUser, session: Session) -> Result<HttpResponse, AppError> {
    let mut context = base_context(Some(&user), &session)?;
    context.insert("title", "Inventory Control");
    render("index.html", &context)
}

fn login_page(session: &Session, form: &LoginForm, errors: &FieldErrors) -> Result<HttpResponse, AppError> {
    let mut context = base_context(None, session)?;
    context.insert("title", "Login");
    context.insert("form", form);
    context.insert("errors", errors);
    render("login.html", &context)
}

#[get("/login")]
pub async fn login_handler(identity: Option<Identity>, session: Session) -> Result<HttpResponse, AppError> {
    if identity.is_some() {
        return Ok(redirect("/"));
    }
    login_page(&session, &LoginForm::default(), &FieldErrors::new())
}

#[post("/login")]
pub async fn login_form_handler(
    Form(form): Form<LoginForm>,
    state: Data<AppState>,
    request: HttpRequest,
    session: Session,
) -> Result<HttpResponse, AppError> {
    if let Err(errors) = form.validate() {
        return login_page(&session, &form, &errors);
    }

    let username = form.username.trim();
    let user = db::get_user_by_username(&state.db_pool, username).await?;
    let verified = match &user {
        Some(user) => {
            utils::verify_password_blocking(form.password.clone(), user.pwd_hash.clone()).await?
        }
        None => false,
    };

    match user {
        Some(user) if verified => {
            Identity::login(&request.extensions(), user.id.to_string())
                .map_err(|e| AppError::IdentityError(e.to_string()))?;
            log::info!("User {} logged in.", user.username);
            Ok(redirect("/"))
        }
        _ => {
            log::warn!("Failed login attempt for username {}.", username);
            flash::push(&session, Level::Danger, "Invalid username or password.")?;
            login_page(&session, &form, &FieldErrors::new())
        }
    }
}

#[get("/logout")]
pub async fn logout_handler(user: CurrentUser, identity: Identity) -> HttpResponse {
    log::info!("User {} logged out.", user.username);
    identity.logout();
    redirect("/login")
}

fn register_page(
    user: &CurrentUser,
    session: &Session,
    form: &RegisterForm,
    errors: &FieldErrors,
) -> Result<HttpResponse, AppError> {
    let mut context = base_context(Some(user), session)?;
    context.insert("title", "Register User");
    context.insert("form", form);
    context.insert("errors", errors);
    render("register.html", &context)
}

/// Register handler
#[get("/register")]
pub async fn register_handler(AdminUser(user): AdminUser, session: Session) -> Result<HttpResponse, AppError> {
    register_page(&user, &session, &RegisterForm::default(), &FieldErrors::new())
}

/// Register Form handler
#[post("/register")]
pub async fn register_form_handler(
    AdminUser(user): AdminUser,
    Form(form): Form<RegisterForm>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let mut errors = form.validate().err().unwrap_or_default();
    let username = form.username.trim();
    if !errors.contains_key("username")
        && db::get_user_by_username(&state.db_pool, username).await?.is_some()
    {
        errors.insert("username", "Please use a different username.".into());
    }
    if !errors.is_empty() {
        return register_page(&user, &session, &form, &errors);
    }

    let pwd_hash = utils::hash_password_blocking(form.password.clone()).await?;
    let created = db::create_user(
        &state.db_pool,
        username,
        form.email.trim(),
        &pwd_hash,
        Role::User,
    )
    .await?;

    log::info!(target: "audit", "New user registered by {}: {}.", user.username, created.username);
    flash::push(&session, Level::Success, "User registered successfully!")?;
    Ok(redirect("/"))
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct PageQuery {
    page: String,
}

async fn item_list_page(
    user: &CurrentUser,
    form: &SearchForm,
    page: i64,
    state: &AppState,
    session: &Session,
) -> Result<HttpResponse, AppError> {
    let mut context = base_context(Some(user), session)?;
    context.insert("title", "Inventory Items");
    context.insert("form", form);

    match form.validate() {
        Ok(criteria) => {
            let page = search::search_items(&state.db_pool, &criteria, page).await?;
            context.insert("page", &page);
            context.insert("field", criteria.field.as_str());
            context.insert("search_term", criteria.search_term.as_deref().unwrap_or(""));
            context.insert("errors", &FieldErrors::new());
        }
        Err(errors) => {
            context.insert("errors", &errors);
        }
    }
    render("list_items.html", &context)
}

#[get("/list_items")]
pub async fn list_items_handler(
    user: CurrentUser,
    Query(form): Query<SearchForm>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let page = forms::page_number(&form.page);
    item_list_page(&user, &form, page, &state, &session).await
}

#[post("/list_items")]
pub async fn search_items_handler(
    user: CurrentUser,
    Query(query): Query<PageQuery>,
    Form(form): Form<SearchForm>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let page = forms::page_number(&query.page);
    item_list_page(&user, &form, page, &state, &session).await
}

fn item_form_page(
    user: &CurrentUser,
    session: &Session,
    form: &ItemForm,
    errors: &FieldErrors,
    part_number: Option<i64>,
) -> Result<HttpResponse, AppError> {
    let mut context = base_context(Some(user), session)?;
    match part_number {
        Some(part_number) => {
            context.insert("title", "Update Item");
            context.insert("action", &format!("/update_item/{part_number}"));
            context.insert("part_number", &part_number);
        }
        None => {
            context.insert("title", "Add Item");
            context.insert("action", "/add_item");
        }
    }
    context.insert("form", form);
    context.insert("errors", errors);
    render("item_form.html", &context)
}

#[get("/add_item")]
pub async fn add_item_handler(AdminUser(user): AdminUser, session: Session) -> Result<HttpResponse, AppError> {
    item_form_page(&user, &session, &ItemForm::default(), &FieldErrors::new(), None)
}

#[post("/add_item")]
pub async fn add_item_form_handler(
    AdminUser(user): AdminUser,
    Form(form): Form<ItemForm>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return item_form_page(&user, &session, &form, &errors, None),
    };

    let item = db::insert_item(&state.db_pool, None, &input).await?;
    log::info!(target: "audit", "Item added by {}: {}", user.username, item.part_number);
    flash::push(&session, Level::Success, "Item added successfully!")?;
    Ok(redirect("/list_items"))
}

#[get("/update_item/{part_number}")]
pub async fn update_item_handler(
    AdminUser(user): AdminUser,
    part_number: Path<i64>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let part_number = part_number.into_inner();
    let item = db::get_item(&state.db_pool, part_number)
        .await?
        .ok_or(AppError::NotFound)?;
    item_form_page(&user, &session, &ItemForm::from(&item), &FieldErrors::new(), Some(part_number))
}

#[post("/update_item/{part_number}")]
pub async fn update_item_form_handler(
    AdminUser(user): AdminUser,
    part_number: Path<i64>,
    Form(form): Form<ItemForm>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let part_number = part_number.into_inner();
    if !db::item_exists(&state.db_pool, part_number).await? {
        return Err(AppError::NotFound);
    }
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return item_form_page(&user, &session, &form, &errors, Some(part_number)),
    };

    db::update_item(&state.db_pool, part_number, &input).await?;
    log::info!(target: "audit", "Item updated by {}: {}", user.username, part_number);
    flash::push(&session, Level::Success, "Item updated successfully!")?;
    Ok(redirect("/list_items"))
}

#[post("/delete_item/{part_number}")]
pub async fn delete_item_handler(
    AdminUser(user): AdminUser,
    part_number: Path<i64>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let part_number = part_number.into_inner();
    db::delete_item(&state.db_pool, part_number).await?;
    log::info!(target: "audit", "Item deleted by {}: {}", user.username, part_number);
    flash::push(&session, Level::Success, "Item deleted successfully!")?;
    Ok(redirect("/list_items"))
}

#[get("/check_inventory")]
pub async fn check_inventory_handler(
    user: CurrentUser,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let items = db::low_stock_items(&state.db_pool).await?;
    let mut context = base_context(Some(&user), &session)?;
    context.insert("title", "Low Stock");
    context.insert("items", &items);
    render("check_inventory.html", &context)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanDirection {
    In,
    Out,
}

impl ScanDirection {
    fn path(self) -> &'static str {
        match self {
            ScanDirection::In => "/scan_in",
            ScanDirection::Out => "/scan_out",
        }
    }

    fn title(self) -> &'static str {
        match self {
            ScanDirection::In => "Scan In Parts",
            ScanDirection::Out => "Scan Out Parts",
        }
    }
}

fn scan_page(
    direction: ScanDirection,
    user: &CurrentUser,
    session: &Session,
    form: &ScanForm,
    errors: &FieldErrors,
) -> Result<HttpResponse, AppError> {
    let mut context = base_context(Some(user), session)?;
    context.insert("title", direction.title());
    context.insert("action", direction.path());
    context.insert("form", form);
    context.insert("errors", errors);
    render("scan.html", &context)
}

async fn apply_scan(
    direction: ScanDirection,
    user: &CurrentUser,
    form: &ScanForm,
    state: &AppState,
    session: &Session,
) -> Result<HttpResponse, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return scan_page(direction, user, session, form, &errors),
    };

    let outcome = match direction {
        ScanDirection::In => {
            scan::scan_in(&state.db_pool, input.part_number, input.quantity, &user.username).await
        }
        ScanDirection::Out => {
            scan::scan_out(&state.db_pool, input.part_number, input.quantity, &user.username).await
        }
    };

    match outcome {
        Ok(_) => {
            let message = match direction {
                ScanDirection::In => format!(
                    "Added {} units to part number {}.",
                    input.quantity, input.part_number
                ),
                ScanDirection::Out => format!(
                    "Removed {} units from part number {}.",
                    input.quantity, input.part_number
                ),
            };
            flash::push(session, Level::Success, message)?;
        }
        Err(AppError::NotFound) => flash::push(session, Level::Danger, "Part number not found.")?,
        Err(e @ AppError::InsufficientStock { .. }) => flash::push(session, Level::Danger, e.to_string())?,
        Err(AppError::Validation(errors)) => return scan_page(direction, user, session, form, &errors),
        Err(e) => return Err(e),
    }
    Ok(redirect(direction.path()))
}

#[get("/scan_in")]
pub async fn scan_in_handler(user: CurrentUser, session: Session) -> Result<HttpResponse, AppError> {
    scan_page(ScanDirection::In, &user, &session, &ScanForm::default(), &FieldErrors::new())
}

#[post("/scan_in")]
pub async fn scan_in_form_handler(
    user: CurrentUser,
    Form(form): Form<ScanForm>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    apply_scan(ScanDirection::In, &user, &form, &state, &session).await
}

#[get("/scan_out")]
pub async fn scan_out_handler(user: CurrentUser, session: Session) -> Result<HttpResponse, AppError> {
    scan_page(ScanDirection::Out, &user, &session, &ScanForm::default(), &FieldErrors::new())
}

#[post("/scan_out")]
pub async fn scan_out_form_handler(
    user: CurrentUser,
    Form(form): Form<ScanForm>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    apply_scan(ScanDirection::Out, &user, &form, &state, &session).await
}

#[get("/export_data")]
pub async fn export_data_handler(
    AdminUser(user): AdminUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let data = transfer::export_csv(&state.db_pool).await?;
    log::info!(target: "audit", "Data exported by {}.", user.username);
    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .append_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=inventory_data.csv",
        ))
        .body(data))
}

#[derive(MultipartForm)]
pub struct ImportUpload {
    #[multipart(limit = "8MB")]
    file: Option<UploadedFile>,
}

fn import_page(user: &CurrentUser, session: &Session) -> Result<HttpResponse, AppError> {
    let mut context = base_context(Some(user), session)?;
    context.insert("title", "Import Data");
    render("import_data.html", &context)
}

#[get("/import_data")]
pub async fn import_data_handler(AdminUser(user): AdminUser, session: Session) -> Result<HttpResponse, AppError> {
    import_page(&user, &session)
}

#[post("/import_data")]
pub async fn import_data_form_handler(
    AdminUser(user): AdminUser,
    MultipartForm(upload): MultipartForm<ImportUpload>,
    state: Data<AppState>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let Some(file) = upload.file else {
        flash::push(&session, Level::Danger, "Invalid form submission.")?;
        return import_page(&user, &session);
    };
    let is_csv = file
        .file_name
        .as_deref()
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(".csv"));
    if !is_csv {
        flash::push(&session, Level::Danger, "Invalid file format. Please upload a CSV file.")?;
        return import_page(&user, &session);
    }

    match transfer::import_csv(&state.db_pool, &file.data).await {
        Ok(summary) => {
            log::info!(
                target: "audit",
                "Data imported by {}: {} inserted, {} updated, {} skipped.",
                user.username,
                summary.inserted,
                summary.updated,
                summary.skipped
            );
            let mut message = format!(
                "Data imported successfully! {} added, {} updated.",
                summary.inserted, summary.updated
            );
            if summary.skipped > 0 {
                message.push_str(&format!(
                    " {} rows without {} columns were skipped.",
                    summary.skipped,
                    transfer::CSV_HEADERS.len()
                ));
            }
            flash::push(&session, Level::Success, message)?;
            Ok(redirect("/list_items"))
        }
        Err(e) => {
            log::error!("Error importing data: {}", e);
            flash::push(&session, Level::Danger, "An error occurred while importing data.")?;
            Ok(redirect("/import_data"))
        }
    }
}

pub async fn default_handler(req_method: Method) -> Result<HttpResponse, AppError> {
    match req_method {
        Method::GET => Err(AppError::NotFound),
        _ => Ok(HttpResponse::build(StatusCode::METHOD_NOT_ALLOWED).finish()),
    }
}
