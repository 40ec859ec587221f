use actix_web::{Responder, get, patch, post, web};
use common::{error::Res, http::Success, jwt::SessionClaims};

use crate::dtos::profile::ProfileData;
use crate::services::profile::ProfileGate;

/// Reports which onboarding fields are still missing.
///
/// # Output
/// - Success: `{ "isComplete": false, "missingFields": ["phone", "tax_id"] }`
#[get("/status")]
pub async fn get_status(
    claims: web::ReqData<SessionClaims>,
    gate: web::Data<ProfileGate>,
) -> Res<impl Responder> {
    let status = gate.check(claims.user_id).await?;
    Success::ok(status)
}

/// Submits the full onboarding profile. The first successful call opens the
/// user's bank account; later calls only rewrite the profile.
///
/// # Input
/// - `req`: every required field for the chosen `personType`
///
/// # Output
/// - Success: Returns the updated user, with `profile_complete` set
/// - Error: 400 listing each invalid or missing field, 502 if the bank provider fails
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/profile/complete', {
///   method: 'POST',
///   headers: {
///     'Content-Type': 'application/json',
///     'Authorization': `Bearer ${localStorage.getItem('authToken')}`
///   },
///   body: JSON.stringify({
///     personType: 'individual',
///     phone: '(11) 98765-4321',
///     taxId: '529.982.247-25',
///     address: 'Rua Augusta, 100',
///     neighborhood: 'Consolação',
///     postalCode: '01305-000'
///   })
/// });
/// ```
#[post("/complete")]
pub async fn post_complete(
    claims: web::ReqData<SessionClaims>,
    req: web::Json<ProfileData>,
    gate: web::Data<ProfileGate>,
) -> Res<impl Responder> {
    let user = gate.complete(claims.user_id, req.into_inner()).await?;
    Success::ok(user)
}

#[patch("")]
pub async fn patch_profile(
    claims: web::ReqData<SessionClaims>,
    req: web::Json<ProfileData>,
    gate: web::Data<ProfileGate>,
) -> Res<impl Responder> {
    let user = gate.update(claims.user_id, req.into_inner()).await?;
    Success::ok(user)
}
