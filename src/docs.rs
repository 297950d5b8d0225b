use crate::api::activities::WeekPlanResponse;
use crate::api::assets::{SignatureRequest, SignatureResponse, UploadFolder};
use crate::api::attendance::{
    AttendanceListResponse, AttendanceQuery, AttendanceSummary, CheckInRequest, SetStatusRequest,
};
use crate::api::users::{UserListResponse, UserQuery};
use crate::auth::handlers::LoginResponse;
use crate::model::activity::{ActivityEntry, WeekPlan};
use crate::model::attendance::{AttendanceLocation, AttendanceView};
use crate::model::status::AttendanceStatus;
use crate::model::user::User;
use crate::models::{LoginReqDto, RegisterReq};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

pub struct BearerAuth;

impl Modify for BearerAuth {
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
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Field Attendance Tracker

Backend for a mobile attendance app: employees check in once a day with a selfie
and their location, HR reviews and confirms the records.

### Key Features
- **Check-in**
  - Selfie URL, coordinates and accuracy; the address is reverse-geocoded server side
  - Status is derived from the check-in time (Present / Late / Unexcused)
- **Attendance review**
  - Filter by user, department, status and date range; confirm or override status
- **Weekly planner**
  - Per-user activity list for each day of the week
- **Uploads**
  - Signed upload forms for the asset host

### Security
Everything under `/api` requires a **JWT Bearer** access token.
Confirmation and status overrides are limited to **HR** and **Admin**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::update_profile,

        crate::api::attendance::check_in,
        crate::api::attendance::list_attendance,
        crate::api::attendance::attendance_summary,
        crate::api::attendance::get_attendance,
        crate::api::attendance::confirm_attendance,
        crate::api::attendance::set_status,

        crate::api::activities::get_week,
        crate::api::activities::put_week,

        crate::api::assets::upload_signature
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            User,
            UserQuery,
            UserListResponse,
            AttendanceStatus,
            CheckInRequest,
            AttendanceQuery,
            AttendanceLocation,
            AttendanceView,
            AttendanceListResponse,
            SetStatusRequest,
            AttendanceSummary,
            ActivityEntry,
            WeekPlan,
            WeekPlanResponse,
            UploadFolder,
            SignatureRequest,
            SignatureResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Users", description = "User directory and profile"),
        (name = "Attendance", description = "Daily check-in and review"),
        (name = "Activities", description = "Weekly activity planner"),
        (name = "Assets", description = "Signed uploads"),
    )
)]
pub struct ApiDoc;
