/// Generate a `routes` function registering the listed actix services.
///
/// ```ignore
/// macros_utils::routes! {
///     route health_route,
///     route probe_route,
/// }
/// ```
#[cfg(feature = "actix")]
#[macro_export]
macro_rules! routes {
    ($(route $name:ident),* $(,)?) => {
        pub fn routes(cfg: &mut ::actix_web::web::ServiceConfig) {
            $(cfg.service($name);)*
        }
    };
}
