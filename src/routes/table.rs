//! The application route table: every reachable screen of the platform and
//! the gates in front of it. Static data, packaged with the binary.
//!
//! Branches with a layer of role enforcement declare it through
//! `with_policy`; nested layers (see `/order/admin`) are declared outermost
//! first and fail in that order.

use super::{Layout, RouteEntry, RouteTable};
use crate::profile::Role;

const ADMIN: &[Role] = &[Role::Admin];
const FILMMAKER_OR_ADMIN: &[Role] = &[Role::Filmmaker, Role::Admin];
const GEAR_OR_ADMIN: &[Role] = &[Role::Gear, Role::Admin];
const CRM_OR_ADMIN: &[Role] = &[Role::Crm, Role::Admin];
const PARTNER: &[Role] = &[Role::Partner];
const PARTNER_OR_ADMIN: &[Role] = &[Role::Partner, Role::Admin];
const ORDER: &[Role] = &[Role::Order];

pub fn application_routes() -> RouteTable {
    let mut entries = Vec::new();

    // Public
    entries.push(RouteEntry::page("/", Layout::Public, "home"));
    entries.push(RouteEntry::page("/login", Layout::Public, "login"));
    entries.push(RouteEntry::page("/register", Layout::Public, "register"));
    entries.push(RouteEntry::page("/creators/:creator_id", Layout::Public, "creator/profile"));

    // Watch experience (public browsing, stream chrome)
    entries.push(RouteEntry::page("/watch", Layout::Stream, "watch/browse"));
    entries.push(RouteEntry::page("/watch/:title_id", Layout::Stream, "watch/player"));

    // Onboarding flow: authenticated, but exempt from its own gate
    entries.push(
        RouteEntry::page("/onboarding/:user_id", Layout::Authenticated, "onboarding/steps")
            .authenticated()
            .onboarding_exempt(),
    );

    // General authenticated surface
    entries.push(RouteEntry::page("/dashboard", Layout::Authenticated, "dashboard").authenticated());
    entries.push(RouteEntry::redirect("/account", "/account/billing"));
    entries.push(
        RouteEntry::page("/account/billing", Layout::Authenticated, "account/billing")
            .authenticated(),
    );
    entries.push(
        RouteEntry::page("/account/profile", Layout::Authenticated, "account/profile")
            .authenticated(),
    );
    // Legacy alias kept for old bookmarks and emails
    entries.push(RouteEntry::redirect("/account/subscription-settings", "/account/billing"));

    entries.push(
        RouteEntry::page("/submissions", Layout::Authenticated, "submissions/list").authenticated(),
    );
    entries.push(
        RouteEntry::page(
            "/submissions/:submission_id",
            Layout::Authenticated,
            "submissions/detail",
        )
        .authenticated(),
    );

    // Backlot production suite
    entries.push(RouteEntry::redirect("/backlot", "/backlot/projects"));
    entries.push(
        RouteEntry::page("/backlot/projects", Layout::Backlot, "backlot/projects")
            .with_policy(FILMMAKER_OR_ADMIN, "/dashboard"),
    );
    entries.push(
        RouteEntry::page(
            "/backlot/projects/:project_id",
            Layout::Backlot,
            "backlot/project-detail",
        )
        .with_policy(FILMMAKER_OR_ADMIN, "/dashboard"),
    );
    entries.push(
        RouteEntry::page(
            "/backlot/projects/:project_id/call-sheets",
            Layout::Backlot,
            "backlot/call-sheets",
        )
        .with_policy(FILMMAKER_OR_ADMIN, "/dashboard"),
    );

    // Gear House rentals
    entries.push(RouteEntry::redirect("/gear-house", "/gear-house/inventory"));
    entries.push(
        RouteEntry::page("/gear-house/inventory", Layout::GearHouse, "gear/inventory")
            .with_policy(GEAR_OR_ADMIN, "/dashboard"),
    );
    entries.push(
        RouteEntry::page("/gear-house/rentals", Layout::GearHouse, "gear/rentals")
            .with_policy(GEAR_OR_ADMIN, "/dashboard"),
    );
    entries.push(
        RouteEntry::page("/gear-house/verification", Layout::GearHouse, "gear/verification")
            .with_policy(GEAR_OR_ADMIN, "/dashboard"),
    );

    // Sales CRM
    entries.push(RouteEntry::redirect("/crm", "/crm/leads"));
    entries.push(
        RouteEntry::page("/crm/leads", Layout::Crm, "crm/leads")
            .with_policy(CRM_OR_ADMIN, "/dashboard"),
    );
    entries.push(
        RouteEntry::page("/crm/campaigns", Layout::Crm, "crm/campaigns")
            .with_policy(CRM_OR_ADMIN, "/dashboard"),
    );
    entries.push(
        RouteEntry::page("/crm/contacts/:contact_id", Layout::Crm, "crm/contact-detail")
            .with_policy(CRM_OR_ADMIN, "/dashboard"),
    );

    // Order membership. The admin sub-branch nests a second permission
    // layer: membership first, then admin within the membership.
    entries.push(
        RouteEntry::page("/order", Layout::Order, "order/home").with_policy(ORDER, "/dashboard"),
    );
    entries.push(
        RouteEntry::page("/order/members", Layout::Order, "order/members")
            .with_policy(ORDER, "/dashboard"),
    );
    entries.push(
        RouteEntry::page("/order/admin", Layout::Order, "order/admin")
            .with_policy(ORDER, "/dashboard")
            .with_policy(ADMIN, "/order"),
    );

    // Organizations
    entries.push(
        RouteEntry::page("/organizations", Layout::Authenticated, "organizations/list")
            .with_policy(PARTNER_OR_ADMIN, "/dashboard"),
    );
    entries.push(
        RouteEntry::page(
            "/organizations/:org_id",
            Layout::Authenticated,
            "organizations/detail",
        )
        .with_policy(PARTNER_OR_ADMIN, "/dashboard"),
    );

    // Partner portal
    entries.push(RouteEntry::redirect("/partner", "/partner/dashboard"));
    entries.push(
        RouteEntry::page("/partner/dashboard", Layout::Partner, "partner/dashboard")
            .with_policy(PARTNER, "/dashboard"),
    );
    entries.push(
        RouteEntry::page("/partner/titles", Layout::Partner, "partner/titles")
            .with_policy(PARTNER, "/dashboard"),
    );

    // Admin back-office (full tab set)
    entries.push(RouteEntry::redirect("/admin", "/admin/dashboard"));
    for (path, page) in [
        ("/admin/dashboard", "admin/dashboard"),
        ("/admin/submissions", "admin/submissions"),
        ("/admin/users", "admin/users"),
        ("/admin/organizations", "admin/organizations"),
        ("/admin/gear", "admin/gear"),
        ("/admin/order", "admin/order"),
        ("/admin/crm", "admin/crm"),
    ] {
        entries.push(
            RouteEntry::page(path, Layout::Admin, page).with_policy(ADMIN, "/dashboard"),
        );
    }

    // Catch-all not-found, last
    entries.push(RouteEntry::page("/*", Layout::Public, "not-found"));

    RouteTable::new(entries)
}
