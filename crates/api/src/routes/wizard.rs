//! Route definitions for the storyboard wizard.
//!
//! Mounted at `/projects/{project_id}/wizard`.
//!
//! ```text
//! POST   /                         open_session
//! GET    /                         get_session
//! DELETE /                         close_session
//! POST   /next                     next_step
//! POST   /previous                 previous_step
//! POST   /steps/{step}             go_to_step
//! PUT    /story                    update_story
//! PUT    /step3                    update_generation_step
//! POST   /finalize                 finalize
//! GET    /scenes                   list_scenes
//! POST   /scenes                   add_scene
//! PATCH  /scenes/{index}           update_scene
//! DELETE /scenes/{index}           remove_scene
//! ```

use axum::routing::{patch, post, put};
use axum::Router;

use crate::handlers::{scene_list, wizard};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(wizard::open_session)
                .get(wizard::get_session)
                .delete(wizard::close_session),
        )
        .route("/next", post(wizard::next_step))
        .route("/previous", post(wizard::previous_step))
        .route("/steps/{step}", post(wizard::go_to_step))
        .route("/story", put(wizard::update_story))
        .route("/step3", put(wizard::update_generation_step))
        .route("/finalize", post(wizard::finalize))
        .route(
            "/scenes",
            post(scene_list::add_scene).get(scene_list::list_scenes),
        )
        .route(
            "/scenes/{index}",
            patch(scene_list::update_scene).delete(scene_list::remove_scene),
        )
}
