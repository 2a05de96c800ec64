use crate::models::{Permission, Session};

/// MenuEntry
///
/// One sidebar entry. `required_permission = None` means the entry is visible
/// to any authenticated console session; the superuser sees everything
/// regardless of the stored permission set.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuEntry {
    pub label: &'static str,
    pub route: &'static str,
    pub required_permission: Option<Permission>,
}

/// MENU_CATALOG
///
/// The fixed menu, in declaration order. Visibility filtering never reorders
/// entries. The admin-management entry is not part of this catalog; it is
/// appended for the superuser only (see `visible_entries`).
pub static MENU_CATALOG: [MenuEntry; 6] = [
    MenuEntry {
        label: "Overview",
        route: "/",
        required_permission: None,
    },
    MenuEntry {
        label: "Payment Review",
        route: "/payments",
        required_permission: Some(Permission::ManagePayments),
    },
    MenuEntry {
        label: "Reports",
        route: "/reports",
        required_permission: Some(Permission::ManageReports),
    },
    MenuEntry {
        label: "Users",
        route: "/users",
        required_permission: Some(Permission::ManageUsers),
    },
    MenuEntry {
        label: "Subscription Plans",
        route: "/plans",
        required_permission: Some(Permission::ManagePlans),
    },
    MenuEntry {
        label: "System Settings",
        route: "/settings",
        required_permission: Some(Permission::ManageSettings),
    },
];

/// ADMIN_MANAGEMENT_ENTRY
///
/// Visible iff the session role is exactly `SUPER_ADMIN`, independent of the
/// permission set.
pub static ADMIN_MANAGEMENT_ENTRY: MenuEntry = MenuEntry {
    label: "Admin Accounts",
    route: "/admins",
    required_permission: None,
};

/// visible_entries
///
/// Computes the ordered sequence of visible menu entries for a session. Pure
/// function of its inputs: callers re-derive it on every session or route
/// change instead of caching.
///
/// Rules, per entry of the catalog:
/// - no session yet (still loading) -> no entries at all, never optimistic;
/// - superuser -> every entry, plus the admin-management entry appended;
/// - otherwise -> entries with no required permission, and entries whose
///   required permission is in the session's permission set.
///
/// Note: this controls menu visibility only. It does not block direct
/// navigation to a route; page-level access control is the `RouteGuard`'s
/// job, per page.
pub fn visible_entries(session: Option<&Session>) -> Vec<&'static MenuEntry> {
    let Some(session) = session else {
        return Vec::new();
    };

    let authority = session.authority();

    let mut entries: Vec<&'static MenuEntry> = MENU_CATALOG
        .iter()
        .filter(|entry| match entry.required_permission {
            None => true,
            Some(permission) => authority.allows(permission),
        })
        .collect();

    if authority.is_super() {
        entries.push(&ADMIN_MANAGEMENT_ENTRY);
    }

    entries
}

/// active_entry
///
/// Picks the highlighted entry: the one whose route exactly equals the current
/// route. No prefix matching, no nested-route matching — `/users/42` activates
/// nothing.
pub fn active_entry<'a>(
    entries: &[&'a MenuEntry],
    current_route: &str,
) -> Option<&'a MenuEntry> {
    entries
        .iter()
        .find(|entry| entry.route == current_route)
        .copied()
}
