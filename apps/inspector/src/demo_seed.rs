use std::collections::BTreeMap;
use std::sync::Arc;

use grantlens_application::AccessReviewPorts;
use grantlens_core::{AppResult, UserId};
use grantlens_domain::{
    AccessFlags, Grant, GrantSourceType, RiskAssessment, RiskLevel, RoleHierarchyEntry,
    SharingRuleAccess, UserDetails,
};
use grantlens_infrastructure::{InMemoryAccessDirectory, UserAccessFixture};
use tracing::info;

const DEMO_OPERATOR_USER_ID: &str = "005DEMO0000ADMIN";
const DEMO_OPERATOR_EMAIL: &str = "avery.admin@northwind.example";
const DEMO_REVIEWED_USER_ID: &str = "005DEMO0000SALES";
const DEMO_REVIEWED_EMAIL: &str = "jordan.sales@northwind.example";
const DEMO_FIELD_BATCH_SIZE: usize = 50;

/// Builds ports over an in-memory directory with a small demo org.
pub async fn ports() -> AppResult<AccessReviewPorts> {
    let operator_id = UserId::new(DEMO_OPERATOR_USER_ID)?;
    let reviewed_id = UserId::new(DEMO_REVIEWED_USER_ID)?;
    let directory = Arc::new(
        InMemoryAccessDirectory::new()
            .with_operator(operator_id.clone())
            .with_field_batch_size(DEMO_FIELD_BATCH_SIZE),
    );

    directory.upsert_user(operator_id, operator_fixture()).await;
    directory.upsert_user(reviewed_id, reviewed_fixture()).await;

    info!(
        operator = DEMO_OPERATOR_EMAIL,
        reviewed = DEMO_REVIEWED_EMAIL,
        "seeded in-memory access directory"
    );

    Ok(AccessReviewPorts {
        users: directory.clone(),
        risk: directory.clone(),
        object_grants: directory.clone(),
        field_grants: directory.clone(),
        system_permissions: directory.clone(),
        sharing: directory.clone(),
        remediation: directory,
    })
}

fn operator_fixture() -> UserAccessFixture {
    let mut fixture = UserAccessFixture::new(UserDetails {
        user_name: "Avery Admin".to_owned(),
        user_email: DEMO_OPERATOR_EMAIL.to_owned(),
        profile_name: "System Administrator".to_owned(),
        is_active: true,
        permission_sets: vec!["Security_Audit".to_owned()],
    });
    fixture.system_permissions = BTreeMap::from([
        ("Modify_All_Data".to_owned(), true),
        ("View_All_Data".to_owned(), true),
        ("Manage_Users".to_owned(), true),
    ]);
    fixture
}

fn reviewed_fixture() -> UserAccessFixture {
    let full = AccessFlags {
        read: true,
        create: true,
        edit: true,
        delete: true,
    };
    let read_edit = AccessFlags {
        read: true,
        edit: true,
        ..AccessFlags::default()
    };

    let mut fixture = UserAccessFixture::new(UserDetails {
        user_name: "Jordan Sales".to_owned(),
        user_email: DEMO_REVIEWED_EMAIL.to_owned(),
        profile_name: "Standard User".to_owned(),
        is_active: true,
        permission_sets: vec!["Sales_Ops".to_owned(), "Report_Builder".to_owned()],
    });

    fixture.risk = RiskAssessment {
        high_risk_count: 2,
        risk_score: 68,
        risk_level: RiskLevel::High,
        critical_findings: vec![
            "Export Reports granted through Report_Builder".to_owned(),
            "Delete on Opportunity granted through Sales_Ops".to_owned(),
        ],
    };

    fixture.object_grants = vec![
        Grant::object(GrantSourceType::Profile, "Standard User", "Account")
            .with_flags(AccessFlags::READ)
            .assigned("Avery Admin", "Direct"),
        Grant::object(GrantSourceType::PermissionSet, "Sales_Ops", "Account")
            .with_flags(read_edit)
            .assigned("Avery Admin", "Permission Set Group"),
        Grant::object(GrantSourceType::PermissionSet, "Sales_Ops", "Opportunity")
            .with_flags(full),
        Grant::object(GrantSourceType::Profile, "Standard User", "Contact")
            .with_flags(read_edit),
        Grant::object(
            GrantSourceType::Package,
            "Audit Toolkit",
            "SA_Audit__Finding__c",
        )
        .with_flags(AccessFlags::READ),
    ];

    fixture.field_grants = vec![
        Grant::field(
            GrantSourceType::Profile,
            "Standard User",
            "Contact",
            "Contact.Email",
        )
        .with_flags(AccessFlags::READ),
        Grant::field(
            GrantSourceType::PermissionSet,
            "Sales_Ops",
            "Contact",
            "Contact.Email",
        )
        .with_flags(read_edit),
        Grant::field(
            GrantSourceType::Profile,
            "Standard User",
            "Contact",
            "Contact.OtherPhone",
        )
        .with_flags(AccessFlags::READ),
        Grant::field(
            GrantSourceType::PermissionSet,
            "Sales_Ops",
            "Opportunity",
            "Opportunity.Amount",
        )
        .with_flags(read_edit),
        Grant::field(
            GrantSourceType::Package,
            "Audit Toolkit",
            "SA_Audit__Finding__c",
            "Severity__c",
        )
        .with_flags(AccessFlags::READ),
    ];

    fixture.system_permissions = BTreeMap::from([
        ("API_Enabled".to_owned(), true),
        ("Export_Reports".to_owned(), true),
        ("Modify_All_Data".to_owned(), false),
        ("View_Setup".to_owned(), false),
    ]);

    fixture.sharing_rules = vec![SharingRuleAccess {
        object_name: "Opportunity".to_owned(),
        sharing_type: "Criteria-based".to_owned(),
        access_level: "Read/Write".to_owned(),
        shared_with: "West Region Sales".to_owned(),
    }];

    fixture.role_hierarchy = vec![
        RoleHierarchyEntry {
            role_name: "VP Sales".to_owned(),
            parent_role: None,
            access_level: "All".to_owned(),
        },
        RoleHierarchyEntry {
            role_name: "West Region Rep".to_owned(),
            parent_role: Some("VP Sales".to_owned()),
            access_level: "Read".to_owned(),
        },
    ];

    fixture
}
