use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, SignupRequest, SignupResponse},
        friends::{MutationResult, SearchFriendRequest, SendFriendRequest, SendOutcome},
        products::{CatalogStatus, ProductDetails, SaveProductRequest, SavedProductList, SearchResult},
    },
    error::FieldError,
    models::{
        BackupProduct, CatalogSync, Category, Friend, FriendshipRequest, FriendshipView,
        IncomingRequest, OutgoingRequest, Product, ProductOrigin, SavedProductView, User,
        UserSummary,
    },
    response::{ApiResponse, Meta},
    routes::{auth, friends, health, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::signup,
        auth::login,
        auth::logout,
        auth::me,
        friends::friendship_view,
        friends::search_friend,
        friends::send_request,
        friends::accept_request,
        friends::reject_request,
        friends::cancel_request,
        friends::remove_friend,
        products::get_product,
        products::search_product,
        products::list_saved,
        products::save_product,
        products::catalog_status
    ),
    components(
        schemas(
            User,
            UserSummary,
            FriendshipRequest,
            FriendshipView,
            IncomingRequest,
            Friend,
            OutgoingRequest,
            Category,
            Product,
            BackupProduct,
            SavedProductView,
            ProductOrigin,
            CatalogSync,
            SignupRequest,
            SignupResponse,
            LoginRequest,
            LoginResponse,
            SearchFriendRequest,
            SendFriendRequest,
            SendOutcome,
            MutationResult,
            ProductDetails,
            SearchResult,
            SaveProductRequest,
            SavedProductList,
            CatalogStatus,
            FieldError,
            Meta,
            ApiResponse<FriendshipView>,
            ApiResponse<ProductDetails>,
            ApiResponse<SavedProductList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Signup, login and profile"),
        (name = "Friends", description = "Friendship requests and friends"),
        (name = "Products", description = "Catalog search, substitutes and saved products"),
        (name = "Catalog", description = "Catalog refresh status"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
