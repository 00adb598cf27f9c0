//! Dashboard catalog: four topic views, each a list of (query, table, chart) panels.

use common::models::dashboard::ViewSummary;

use crate::chart::ChartSpec;

/// One (query, table, chart) triplet.
#[derive(Debug)]
pub struct PanelDef {
    pub id: &'static str,
    pub title: &'static str,
    pub sql: &'static str,
    pub chart: ChartSpec,
}

#[derive(Debug)]
pub struct ViewDef {
    pub id: &'static str,
    pub title: &'static str,
    pub header: &'static str,
    pub panels: &'static [PanelDef],
}

impl ViewDef {
    pub fn panel(&self, id: &str) -> Option<&'static PanelDef> {
        self.panels.iter().find(|p| p.id == id)
    }

    pub fn summary(&self) -> ViewSummary {
        ViewSummary {
            id: self.id.to_string(),
            title: self.title.to_string(),
            panel_count: self.panels.len(),
        }
    }
}

pub fn all() -> &'static [ViewDef] {
    VIEWS
}

pub fn find(id: &str) -> Option<&'static ViewDef> {
    VIEWS.iter().find(|v| v.id == id)
}

static VIEWS: &[ViewDef] = &[
    ViewDef {
        id: "customers",
        title: "Customers",
        header: "Customer Analytics",
        panels: CUSTOMER_PANELS,
    },
    ViewDef {
        id: "orders",
        title: "Orders",
        header: "Orders Analysis",
        panels: ORDER_PANELS,
    },
    ViewDef {
        id: "warehouses",
        title: "Warehouses",
        header: "Warehouse Performance",
        panels: WAREHOUSE_PANELS,
    },
    ViewDef {
        id: "campaigns",
        title: "Campaigns",
        header: "Campaign Performance",
        panels: CAMPAIGN_PANELS,
    },
];

// Retention counts customers with more than two delivered orders.
static CUSTOMER_PANELS: &[PanelDef] = &[
    PanelDef {
        id: "retention",
        title: "Retention: Prime vs Non-Prime",
        sql: "
SELECT
    is_prime_user,
    ROUND(100.00 * COUNT(*) FILTER (WHERE order_count > 2) / COUNT(*), 2) AS retention
FROM (
    SELECT c.customer_id, COUNT(o.order_id) AS order_count, c.is_prime_user
    FROM customers c
    JOIN orders o USING (customer_id)
    WHERE o.order_status = 'delivered'
    GROUP BY c.customer_id
) t
GROUP BY is_prime_user;",
        chart: ChartSpec::bar("Retention % by Prime Status", "is_prime_user", &["retention"])
            .show_values(),
    },
    PanelDef {
        id: "activation",
        title: "Average Activation Time (Days) by Prime Status",
        sql: "
SELECT
    is_prime_user,
    AVG(EXTRACT(DAY FROM (first_order_date - signup_date))) AS avg_days_to_first_order
FROM (
    SELECT MIN(o.order_date) AS first_order_date, c.signup_date, c.is_prime_user
    FROM customers c
    JOIN orders o USING (customer_id)
    GROUP BY c.customer_id
) t
GROUP BY is_prime_user;",
        chart: ChartSpec::bar(
            "Average activation time by Prime Status",
            "is_prime_user",
            &["avg_days_to_first_order"],
        )
        .show_values(),
    },
    PanelDef {
        id: "lifetime_value",
        title: "Customer Lifetime Value by Prime Status",
        sql: "
SELECT c.is_prime_user, AVG(total_spent) AS avg_lifetime_value
FROM (
    SELECT o.customer_id, SUM(p.amount) AS total_spent
    FROM payments p
    JOIN orders o USING (order_id)
    WHERE o.order_status = 'delivered'
    GROUP BY o.customer_id
) t
JOIN customers c USING (customer_id)
GROUP BY c.is_prime_user;",
        chart: ChartSpec::bar(
            "Average Customer Lifetime Value by Prime Status",
            "is_prime_user",
            &["avg_lifetime_value"],
        )
        .show_values(),
    },
];

static ORDER_PANELS: &[PanelDef] = &[
    PanelDef {
        id: "monthly",
        title: "Monthly Orders & MoM Growth",
        sql: "
SELECT
    month_year,
    count_orders,
    ROUND(100.0 * (count_orders - LAG(count_orders) OVER (ORDER BY month_year))
          / NULLIF(LAG(count_orders) OVER (ORDER BY month_year), 0), 2) AS mom_growth
FROM (
    SELECT TO_CHAR(order_date, 'YYYY-MM') AS month_year, COUNT(*) AS count_orders
    FROM orders
    WHERE order_status = 'delivered'
    GROUP BY TO_CHAR(order_date, 'YYYY-MM')
) t
ORDER BY month_year;",
        chart: ChartSpec::line("Monthly Delivered Orders", "month_year", &["count_orders"])
            .markers(),
    },
    PanelDef {
        id: "status_distribution",
        title: "Order Status Distribution",
        sql: "
SELECT
    order_status,
    ROUND(100.0 * COUNT(*) / (SELECT COUNT(*) FROM orders), 2) AS pct_of_orders
FROM orders
GROUP BY order_status;",
        chart: ChartSpec::pie("Order Status Distribution", "order_status", &["pct_of_orders"])
            .hole(0.4),
    },
    PanelDef {
        id: "city_users",
        title: "Orders by City with Prime vs Non-Prime Users",
        sql: "
SELECT
    c.city,
    COUNT(DISTINCT o.customer_id) FILTER (WHERE c.is_prime_user = 'Yes') AS prime_users,
    COUNT(DISTINCT o.customer_id) FILTER (WHERE c.is_prime_user = 'No') AS non_prime_users,
    COUNT(*) AS order_count
FROM customers c
JOIN orders o USING (customer_id)
WHERE o.order_status = 'delivered'
GROUP BY c.city
ORDER BY order_count DESC;",
        chart: ChartSpec::bar(
            "Prime vs Non-Prime Users by City",
            "city",
            &["prime_users", "non_prime_users"],
        )
        .y_label("user_count")
        .show_values(),
    },
    PanelDef {
        id: "median_order_value",
        title: "Median Order Value by City",
        sql: "
SELECT
    PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY p.amount) AS median_order_amount,
    c.city
FROM payments p
JOIN orders o USING (order_id)
JOIN customers c USING (customer_id)
GROUP BY c.city
ORDER BY median_order_amount DESC;",
        chart: ChartSpec::bar("Median Order Value by City", "city", &["median_order_amount"])
            .show_values(),
    },
    PanelDef {
        id: "peak_hours",
        title: "Peak Order Hours",
        sql: "
SELECT DATE_PART('hour', order_date) AS order_hour, COUNT(*) AS total_orders
FROM orders
WHERE order_status = 'delivered'
GROUP BY order_hour
ORDER BY total_orders DESC;",
        chart: ChartSpec::bar("Total Orders by Hour of Day", "order_hour", &["total_orders"])
            .show_values(),
    },
];

static WAREHOUSE_PANELS: &[PanelDef] = &[
    PanelDef {
        id: "orders",
        title: "Orders by Warehouse",
        sql: "
SELECT warehouse_id, COUNT(order_id) AS total_orders
FROM orders
GROUP BY warehouse_id
ORDER BY total_orders DESC;",
        chart: ChartSpec::bar("Total Orders by Warehouse", "warehouse_id", &["total_orders"]),
    },
    PanelDef {
        id: "delivery_time",
        title: "Average Delivery Time by Warehouse",
        sql: "
SELECT
    PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY delivery_time_minutes) AS median_time,
    warehouse_id
FROM orders
GROUP BY warehouse_id
ORDER BY median_time DESC;",
        chart: ChartSpec::bar(
            "Median Delivery Time (Minutes) by Warehouse",
            "warehouse_id",
            &["median_time"],
        )
        .show_values(),
    },
    PanelDef {
        id: "cancellations",
        title: "Warehouses with Most Cancellations",
        sql: "
SELECT COUNT(*) AS cancel_warehouse, o.warehouse_id
FROM orders o
JOIN warehouses w USING (warehouse_id)
WHERE o.order_status = 'cancelled'
GROUP BY o.warehouse_id
ORDER BY cancel_warehouse DESC;",
        chart: ChartSpec::bar("Cancellations by Warehouse", "warehouse_id", &["cancel_warehouse"])
            .show_values(),
    },
    PanelDef {
        id: "peak_hour_performance",
        title: "Best Performing Warehouse During Peak Hours",
        sql: "
WITH peak_hours AS (
    SELECT DATE_PART('hour', order_date) AS order_hour
    FROM orders
    GROUP BY order_hour
    ORDER BY COUNT(*) DESC
    LIMIT 3
)
SELECT
    o.warehouse_id,
    w.location,
    DATE_PART('hour', o.order_date) AS order_hour,
    COUNT(*) AS total_order
FROM orders o
JOIN warehouses w USING (warehouse_id)
WHERE DATE_PART('hour', o.order_date) IN (SELECT order_hour FROM peak_hours)
  AND o.order_status = 'delivered'
GROUP BY order_hour, o.warehouse_id, w.location
ORDER BY total_order DESC, order_hour;",
        chart: ChartSpec::bar(
            "Total Orders by Warehouse During Peak Hours",
            "warehouse_id",
            &["total_order"],
        )
        .color("order_hour")
        .show_values(),
    },
];

// CTR and conversion rate are percentages. ROAS and CPC are plain ratios.
static CAMPAIGN_PANELS: &[PanelDef] = &[
    PanelDef {
        id: "ctr",
        title: "CTR by Channel",
        sql: "
SELECT channel,
       ROUND(AVG((clicks::numeric / NULLIF(impressions, 0)) * 100), 2) AS ctr
FROM campaigns
GROUP BY channel
ORDER BY ctr DESC;",
        chart: ChartSpec::bar("CTR % by Channel", "channel", &["ctr"]).show_values(),
    },
    PanelDef {
        id: "roas",
        title: "ROAS by Channel",
        sql: "
SELECT channel,
       ROUND(AVG(conversions::numeric / NULLIF(spend, 0)), 4) AS roas
FROM campaigns
GROUP BY channel
ORDER BY roas DESC;",
        chart: ChartSpec::bar("ROAS by Channel", "channel", &["roas"]).show_values(),
    },
    PanelDef {
        id: "cpc",
        title: "Cost Per Click by Channel",
        sql: "
SELECT channel,
       ROUND(AVG(spend::numeric / NULLIF(clicks, 0)), 2) AS cpc
FROM campaigns
GROUP BY channel
ORDER BY cpc DESC;",
        chart: ChartSpec::bar("Cost Per Click by Channel", "channel", &["cpc"]).show_values(),
    },
    PanelDef {
        id: "conversion_rate",
        title: "Conversion Rate by Channel",
        sql: "
SELECT channel,
       ROUND(AVG((conversions::numeric / NULLIF(clicks, 0)) * 100), 2) AS cr
FROM campaigns
GROUP BY channel
ORDER BY cr DESC;",
        chart: ChartSpec::bar("Conversion Rate % by Channel", "channel", &["cr"]).show_values(),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::dashboard::ChartKind;
    use std::collections::HashSet;

    #[test]
    fn test_four_views_in_order() {
        let ids: Vec<_> = all().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["customers", "orders", "warehouses", "campaigns"]);
        let titles: Vec<_> = all().iter().map(|v| v.title).collect();
        assert_eq!(titles, vec!["Customers", "Orders", "Warehouses", "Campaigns"]);
    }

    #[test]
    fn test_panel_ids_unique_within_view() {
        for view in all() {
            let ids: HashSet<_> = view.panels.iter().map(|p| p.id).collect();
            assert_eq!(ids.len(), view.panels.len(), "duplicate panel id in {}", view.id);
            assert!(!view.panels.is_empty());
        }
    }

    #[test]
    fn test_chart_columns_appear_in_sql() {
        for view in all() {
            for panel in view.panels {
                let sql = panel.sql.to_lowercase();
                let chart = &panel.chart;
                for column in std::iter::once(chart.x).chain(chart.y.iter().copied()).chain(chart.color) {
                    assert!(sql.contains(column), "{}/{} lacks {}", view.id, panel.id, column);
                }
            }
        }
    }

    #[test]
    fn test_ratio_metrics_are_not_scaled() {
        let campaigns = find("campaigns").unwrap();
        for id in ["roas", "cpc"] {
            let sql = campaigns.panel(id).unwrap().sql;
            assert!(!sql.contains("100"), "{id} should be a plain ratio");
            assert!(sql.contains("NULLIF"));
        }
        assert!(campaigns.panel("ctr").unwrap().sql.contains("* 100"));
    }

    #[test]
    fn test_cancellations_count_cancelled_orders() {
        let sql = find("warehouses").unwrap().panel("cancellations").unwrap().sql;
        assert!(sql.contains("order_status = 'cancelled'"));
        assert!(!sql.contains("'delivered'"));
    }

    #[test]
    fn test_lookup() {
        let orders = find("orders").unwrap();
        assert_eq!(orders.summary().panel_count, 5);
        assert_eq!(orders.panel("status_distribution").unwrap().chart.kind, ChartKind::Pie);
        assert_eq!(orders.panel("monthly").unwrap().chart.kind, ChartKind::Line);
        assert!(orders.panel("nope").is_none());
        assert!(find("sales").is_none());
    }
}
