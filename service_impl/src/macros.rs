/// Generates the `XxxServiceDeps` trait and the generic `XxxServiceImpl<Deps>`
/// struct for a service built out of other services/daos. Each field becomes
/// an associated type on the deps trait and an `Arc<Deps::Field>` on the
/// struct, so the binary crate wires concrete types once in one place
/// (`main.rs`) instead of every service threading its dependencies' generics
/// through its own signature.
///
/// Unlike the source this pattern is grounded on, there is no
/// `Context`/`Authentication<Context>` associated type here: every operation
/// in this core is scoped by an explicit `consultant_id: Uuid` parameter
/// instead of a caller-identity context, since authentication is out of scope.
#[macro_export]
macro_rules! gen_service_impl {
    (
        struct $service_name:ident : $trait:path = $dependencies:ident {
            $($field_name:ident: $field_type:path = $field_attr:ident),* $(,)?
        }
    ) => {
        pub trait $dependencies {
            type Transaction: dao::Transaction + Send + Sync + Clone + std::fmt::Debug + 'static;
            $(
                type $field_name: $field_type + Sync + Send;
            )*
        }

        pub struct $service_name<Deps: $dependencies> {
            $(
                pub $field_attr: std::sync::Arc<Deps::$field_name>,
            )*
        }
    };
}
