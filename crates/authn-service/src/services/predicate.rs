//! Translation of list parameters into a store query.

use crate::models::{ListAuthenticationsPredicate, ListRequest, Method, QueryParams};

/// Build the store request for a list call.
///
/// `Method::None` leaves the method unconstrained. An empty page token is the
/// same as no page token.
pub fn build_list_request(
    method: Method,
    limit: u64,
    page_token: Option<String>,
) -> ListRequest<ListAuthenticationsPredicate> {
    let method = match method {
        Method::None => None,
        other => Some(other),
    };

    ListRequest {
        predicate: ListAuthenticationsPredicate { method },
        query_params: QueryParams {
            limit,
            page_token: page_token.filter(|token| !token.is_empty()),
        },
    }
}
