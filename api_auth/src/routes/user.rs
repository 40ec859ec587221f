use actix_web::{Responder, get, web};
use common::{error::Res, http::Success, jwt::SessionClaims};

use crate::services::auth::AuthService;

/// Endpoint to retrieve the current authenticated user's information.
///
/// The user id comes from the session claims placed on the request by the
/// auth middleware; the record itself is read fresh from the store.
///
/// # Output
/// - Success: Returns a JSON object with the user's profile information
/// - Error: Returns 401 Unauthorized if no valid token is provided or 404 Not Found if user doesn't exist
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/me', {
///   headers: {
///     'Authorization': `Bearer ${localStorage.getItem('authToken')}`
///   }
/// });
///
/// if (response.ok) {
///   const user = await response.json();
///   // { id, email, name, plan_id, email_verified, profile_complete, ... }
/// }
/// ```
#[get("/me")]
pub async fn get_me(
    claims: web::ReqData<SessionClaims>,
    auth: web::Data<AuthService>,
) -> Res<impl Responder> {
    let user = auth.current_user(claims.user_id).await?;
    Success::ok(user)
}
