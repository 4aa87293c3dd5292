use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{MagicLinkService, TokenService};
use crate::configuration::{ApplicationSettings, JwtSettings};
use crate::directory::UserDirectory;
use crate::email_client::EmailSender;
use crate::invites::{InviteDecisionService, InviteService, InviteStore, ReviewerRegistry};
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{
    accept_invite, create_invite, decline_invite, health_check, refresh, resend_code,
    resolve_invite, signin, signout, signup, verify,
};
use crate::store::KeyValueStore;

/// External collaborators injected into the services. Production wires
/// the Postgres/HTTP implementations, tests wire the in-memory ones.
pub struct Dependencies {
    pub kv_store: Arc<dyn KeyValueStore>,
    pub users: Arc<dyn UserDirectory>,
    pub mailer: Arc<dyn EmailSender>,
    pub invites: Arc<dyn InviteStore>,
    pub registry: Arc<dyn ReviewerRegistry>,
}

pub fn run(
    listener: TcpListener,
    application: ApplicationSettings,
    jwt: JwtSettings,
    deps: Dependencies,
) -> Result<Server, std::io::Error> {
    let magic_link = MagicLinkService::new(
        deps.kv_store.clone(),
        deps.users.clone(),
        deps.mailer.clone(),
        application.frontend_base_url.clone(),
    );
    let token_service = TokenService::new(deps.kv_store.clone(), jwt.clone());
    let invite_service = InviteService::new(deps.invites.clone());
    let decision_service = InviteDecisionService::new(invite_service.clone(), deps.registry.clone());

    let magic_link = web::Data::new(magic_link);
    let token_service = web::Data::new(token_service);
    let invite_service = web::Data::new(invite_service);
    let decision_service = web::Data::new(decision_service);
    let application_data = web::Data::new(application);
    let users_data: web::Data<dyn UserDirectory> = web::Data::from(deps.users.clone());
    let mailer_data: web::Data<dyn EmailSender> = web::Data::from(deps.mailer.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(magic_link.clone())
            .app_data(token_service.clone())
            .app_data(invite_service.clone())
            .app_data(decision_service.clone())
            .app_data(application_data.clone())
            .app_data(users_data.clone())
            .app_data(mailer_data.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/signup", web::post().to(signup))
            .route("/auth/signin", web::post().to(signin))
            .route("/auth/verify", web::post().to(verify))
            .route("/auth/resend-code", web::post().to(resend_code))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/reviewer-invites/resolve", web::get().to(resolve_invite))
            // Protected routes (require a valid access token)
            .service(
                web::resource("/auth/signout")
                    .wrap(JwtMiddleware::new(jwt.clone()))
                    .route(web::post().to(signout)),
            )
            .service(
                web::scope("/reviewer-invites")
                    .wrap(JwtMiddleware::new(jwt.clone()))
                    .route("", web::post().to(create_invite))
                    .route("/accept", web::post().to(accept_invite))
                    .route("/decline", web::post().to(decline_invite)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
