//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any I/O, including every store call, must be awaited rather than
//! run synchronously.
use actix_web::{get, http::header::AUTHORIZATION, web, HttpResponse, Responder};
use log::*;
use loyalty_engine::{AuthApi, LoyaltyApi, LoyaltyApiError, OrderManagement, UserManagement};

use crate::{
    auth::{AuthenticatedUser, TokenIssuer},
    dto::{Credentials, OrderView, WithdrawalRequest, WithdrawalView},
    errors::ServerError,
    helpers::parse_order_number,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>); }
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(register => Post "/user/register" impl UserManagement);
/// Registers a new user and logs them straight in. The access token is returned in the `Authorization` header.
pub async fn register<B: UserManagement>(
    body: web::Json<Credentials>,
    api: web::Data<AuthApi<B>>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received registration request for '{}'", body.login);
    let user = api.register(&body.login, &body.password).await?;
    let token = issuer.issue_token(&user)?;
    Ok(HttpResponse::Ok().insert_header((AUTHORIZATION, TokenIssuer::bearer(&token))).finish())
}

route!(login => Post "/user/login" impl UserManagement);
pub async fn login<B: UserManagement>(
    body: web::Json<Credentials>,
    api: web::Data<AuthApi<B>>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received login request for '{}'", body.login);
    let user = api.verify_credentials(&body.login, &body.password).await?;
    let token = issuer.issue_token(&user)?;
    Ok(HttpResponse::Ok().insert_header((AUTHORIZATION, TokenIssuer::bearer(&token))).finish())
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(submit_order => Post "/user/orders" impl OrderManagement);
/// Accepts an order number as a plain-text body.
///
/// * `202 Accepted` - the order is new and will be sent to the accrual service.
/// * `200 OK` - this user has already submitted the order.
/// * `409 Conflict` - another user has already submitted the order.
pub async fn submit_order<B: OrderManagement>(
    user: AuthenticatedUser,
    body: String,
    api: web::Data<LoyaltyApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = parse_order_number(&body)?;
    trace!("💻️ User #{} submitted order {number}", user.id);
    match api.submit_order(user.id, number).await {
        Ok(_) => Ok(HttpResponse::Accepted().finish()),
        Err(LoyaltyApiError::OrderAlreadyExists(_)) => Ok(HttpResponse::Ok().finish()),
        Err(e) => Err(e.into()),
    }
}

route!(my_orders => Get "/user/orders" impl OrderManagement);
pub async fn my_orders<B: OrderManagement>(
    user: AuthenticatedUser,
    api: web::Data<LoyaltyApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Fetching orders for user #{}", user.id);
    let orders = api.orders_for_user(user.id).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let orders = orders.into_iter().map(OrderView::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Balance  ----------------------------------------------------
route!(my_balance => Get "/user/balance" impl OrderManagement);
pub async fn my_balance<B: OrderManagement>(
    user: AuthenticatedUser,
    api: web::Data<LoyaltyApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Fetching balance for user #{}", user.id);
    let balance = api.balance_for_user(user.id).await?;
    Ok(HttpResponse::Ok().json(balance))
}

route!(withdraw => Post "/user/balance/withdraw" impl OrderManagement);
pub async fn withdraw<B: OrderManagement>(
    user: AuthenticatedUser,
    body: web::Json<WithdrawalRequest>,
    api: web::Data<LoyaltyApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let WithdrawalRequest { order, sum } = body.into_inner();
    let number = parse_order_number(&order)?;
    trace!("💻️ User #{} requested withdrawal of {sum} against order {number}", user.id);
    api.withdraw(user.id, number, sum).await?;
    Ok(HttpResponse::Ok().finish())
}

route!(my_withdrawals => Get "/user/withdrawals" impl OrderManagement);
pub async fn my_withdrawals<B: OrderManagement>(
    user: AuthenticatedUser,
    api: web::Data<LoyaltyApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Fetching withdrawals for user #{}", user.id);
    let withdrawals = api.withdrawals_for_user(user.id).await?;
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let withdrawals = withdrawals.into_iter().map(WithdrawalView::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(withdrawals))
}
