//! Request-scoped caller identity.
//!
//! The identity travels in an [`http::Extensions`] map from the inbound
//! handler, through the slurmrestd client, to the outbound transport. The key
//! type is private to this module, so nothing else can read or overwrite it
//! except through these accessors.

use http::Extensions;

#[derive(Debug, Clone)]
struct UserName(String);

/// Attach `user` as the caller identity, replacing any previous one.
pub fn attach(ctx: &mut Extensions, user: impl Into<String>) {
    ctx.insert(UserName(user.into()));
}

/// Returns a context carrying only the caller identity.
pub fn with_user_name(user: impl Into<String>) -> Extensions {
    let mut ctx = Extensions::new();
    attach(&mut ctx, user);
    ctx
}

/// The caller identity, if one was attached.
pub fn user_name(ctx: &Extensions) -> Option<&str> {
    ctx.get::<UserName>().map(|u| u.0.as_str())
}
