use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use rib_engine::addr::Prefix;
use rib_engine::rib::{
    AdjRibOut, ClientOptions, FilterChain, LocRib, RouteTable,
    RouteTableClient, SessionAttrs,
};
use rib_engine::route::attributes::AsPath;
use rib_engine::route::{BgpPath, BgpPathCache, Path, StaticPath};
use rib_engine::test_types::{RecordingClient, Update};

mod common {
    use std::io::Write;

    pub fn init() {
        let _ = env_logger::builder()
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .is_test(true)
            .try_init();
    }
}

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn pfx(s: &str) -> Result<Prefix, Box<dyn std::error::Error>> {
    Ok(Prefix::from_str(s)?)
}

fn addr(s: &str) -> Result<IpAddr, Box<dyn std::error::Error>> {
    Ok(s.parse()?)
}

fn path(
    local_pref: u32,
    source: &str,
) -> Result<Path, Box<dyn std::error::Error>> {
    Ok(Path::new_bgp(BgpPath {
        local_pref,
        as_path: AsPath::from_sequence([65010]),
        next_hop: addr(source)?,
        source: addr(source)?,
        ebgp: true,
        ..Default::default()
    }))
}

#[test]
fn test_best_path_changes() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    let rec = RecordingClient::new();
    loc_rib.register(rec.clone());

    let p = pfx("198.51.100.0/24")?;
    let a = path(100, "192.0.2.1")?;
    let b = path(200, "192.0.2.2")?;
    let c = path(50, "192.0.2.3")?;

    loc_rib.add_path(&p, &a)?;
    assert_eq!(rec.take(), vec![Update::Add(p, a.clone())]);

    loc_rib.add_path(&p, &b)?;
    assert_eq!(
        rec.take(),
        vec![Update::Remove(p, a.clone()), Update::Add(p, b.clone())]
    );

    // not the best, nothing changes for a best-only client
    loc_rib.add_path(&p, &c)?;
    assert!(rec.take().is_empty());
    assert_eq!(loc_rib.get(&p).ok_or("route missing")?.path_count(), 3);

    assert!(loc_rib.remove_path(&p, &b));
    assert_eq!(
        rec.take(),
        vec![Update::Remove(p, b.clone()), Update::Add(p, a.clone())]
    );

    assert!(loc_rib.remove_path(&p, &c));
    assert!(rec.take().is_empty());

    assert!(loc_rib.remove_path(&p, &a));
    assert_eq!(rec.take(), vec![Update::Remove(p, a.clone())]);
    assert_eq!(loc_rib.route_count(), 0);

    assert!(!loc_rib.remove_path(&p, &a));
    assert!(rec.take().is_empty());
    Ok(())
}

#[test]
fn test_duplicate_add() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    let rec = RecordingClient::new();
    loc_rib.register(rec.clone());

    let p = pfx("10.0.0.0/8")?;
    loc_rib.add_path(&p, &path(100, "192.0.2.1")?)?;
    loc_rib.add_path(&p, &path(100, "192.0.2.1")?)?;
    assert_eq!(rec.updates().len(), 1);
    assert_eq!(loc_rib.route_count(), 1);
    Ok(())
}

#[test]
fn test_ecmp_client() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    let rec = RecordingClient::new();
    loc_rib.register_with_options(rec.clone(), ClientOptions::ecmp_only());

    let p = pfx("2001:db8::/32")?;
    let a = path(100, "192.0.2.1")?;
    let tie = path(100, "192.0.2.9")?;
    let worse = path(50, "192.0.2.2")?;
    let better = path(200, "192.0.2.3")?;

    loc_rib.add_path(&p, &a)?;
    loc_rib.add_path(&p, &tie)?;
    assert_eq!(
        rec.take(),
        vec![Update::Add(p, a.clone()), Update::Add(p, tie.clone())]
    );

    loc_rib.add_path(&p, &worse)?;
    assert!(rec.take().is_empty());

    loc_rib.add_path(&p, &better)?;
    assert_eq!(
        rec.take(),
        vec![
            Update::Remove(p, a.clone()),
            Update::Remove(p, tie.clone()),
            Update::Add(p, better.clone()),
        ]
    );
    Ok(())
}

#[test]
fn test_max_paths_client() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    let rec = RecordingClient::new();
    loc_rib.register_with_options(rec.clone(), ClientOptions::max_paths(2));

    let p = pfx("10.0.0.0/8")?;
    let lp100 = path(100, "192.0.2.1")?;
    let lp200 = path(200, "192.0.2.2")?;
    let lp300 = path(300, "192.0.2.3")?;

    loc_rib.add_path(&p, &lp100)?;
    loc_rib.add_path(&p, &lp200)?;
    assert_eq!(
        rec.take(),
        vec![Update::Add(p, lp100.clone()), Update::Add(p, lp200.clone())]
    );

    loc_rib.add_path(&p, &lp300)?;
    assert_eq!(
        rec.take(),
        vec![Update::Remove(p, lp100.clone()), Update::Add(p, lp300.clone())]
    );

    assert_eq!(
        rec.current(),
        vec![(p, lp200.clone()), (p, lp300.clone())]
    );
    Ok(())
}

#[test]
fn test_other_protocols() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    let rec = RecordingClient::new();
    loc_rib.register(rec.clone());

    let p = pfx("10.0.0.0/8")?;
    let stat = Path::Static(StaticPath::new(addr("192.0.2.1")?));
    let bgp = path(100, "192.0.2.2")?;

    loc_rib.add_path(&p, &stat)?;
    loc_rib.add_path(&p, &bgp)?;
    assert_eq!(
        rec.take(),
        vec![
            Update::Add(p, stat.clone()),
            Update::Remove(p, stat.clone()),
            Update::Add(p, bgp.clone()),
        ]
    );
    assert!(loc_rib.contains_pfx_path(&p, &stat));
    assert!(loc_rib.contains_pfx_path(&p, &bgp));
    assert!(!loc_rib.contains_pfx_path(&pfx("10.0.0.0/9")?, &bgp));
    Ok(())
}

#[test]
fn test_new_client_catches_up() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    let p = pfx("10.0.0.0/8")?;
    let q = pfx("2001:db8::/32")?;
    for lp in [100, 200, 300] {
        loc_rib.add_path(&p, &path(lp, "192.0.2.1")?)?;
    }
    loc_rib.add_path(&q, &path(100, "192.0.2.1")?)?;

    let best = RecordingClient::new();
    loc_rib.register(best.clone());
    assert_eq!(
        best.updates(),
        vec![
            Update::Add(p, path(300, "192.0.2.1")?),
            Update::Add(q, path(100, "192.0.2.1")?),
        ]
    );

    let all = RecordingClient::new();
    loc_rib.register_with_options(all.clone(), ClientOptions::max_paths(10));
    assert_eq!(all.updates().len(), 4);
    assert_eq!(loc_rib.client_count(), 2);

    // registering again only changes the options, and replays
    loc_rib.register(all.clone());
    assert_eq!(loc_rib.client_count(), 2);
    assert_eq!(all.updates().len(), 6);

    let all: Arc<dyn RouteTableClient> = all;
    loc_rib.unregister(&all);
    assert_eq!(loc_rib.client_count(), 1);
    Ok(())
}

#[test]
fn test_failing_client() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    let broken = RecordingClient::failing();
    let rec = RecordingClient::new();
    loc_rib.register(broken.clone());
    loc_rib.register(rec.clone());

    let p = pfx("10.0.0.0/8")?;
    loc_rib.add_path(&p, &path(100, "192.0.2.1")?)?;
    assert_eq!(broken.updates().len(), 1);
    assert_eq!(rec.updates().len(), 1);
    assert_eq!(loc_rib.route_count(), 1);
    Ok(())
}

#[test]
fn test_refresh_client() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    let rec = RecordingClient::new();
    loc_rib.register_with_options(rec.clone(), ClientOptions::max_paths(2));

    let p = pfx("10.0.0.0/8")?;
    for lp in [100, 200, 300] {
        loc_rib.add_path(&p, &path(lp, "192.0.2.1")?)?;
    }
    rec.take();

    let client: Arc<dyn RouteTableClient> = rec.clone();
    let seen_before_done = std::cell::Cell::new(None);
    loc_rib.refresh_client(&client, &|| {
        seen_before_done.set(Some(rec.updates().len()))
    });
    assert_eq!(seen_before_done.get(), Some(1));
    assert_eq!(
        rec.take(),
        vec![Update::Refresh(
            p,
            vec![path(300, "192.0.2.1")?, path(200, "192.0.2.1")?]
        )]
    );

    // an empty table still reports the refresh as done
    let empty = LocRib::new();
    let done = std::cell::Cell::new(false);
    empty.refresh_client(&client, &|| done.set(true));
    assert!(done.get());
    assert!(rec.updates().is_empty());
    Ok(())
}

#[test]
fn test_queries() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    for p in ["10.0.0.0/8", "10.1.0.0/16", "10.1.1.0/24", "11.0.0.0/8"] {
        loc_rib.add_path(&pfx(p)?, &path(100, "192.0.2.1")?)?;
    }

    assert_eq!(loc_rib.lpm(&pfx("10.1.1.1/32")?).len(), 3);
    assert_eq!(loc_rib.get_longer(&pfx("10.1.0.0/16")?).len(), 2);
    assert_eq!(loc_rib.dump().len(), 4);
    assert!(loc_rib.get(&pfx("10.1.0.0/16")?).is_some());
    assert!(loc_rib.get(&pfx("10.2.0.0/16")?).is_none());

    let dump = loc_rib.to_string();
    assert!(dump.starts_with("Loc-RIB DUMP:"));
    assert!(dump.contains("10.1.1.0/24"));
    Ok(())
}

#[test]
fn test_dispose() -> TestResult {
    common::init();
    let loc_rib = LocRib::new();
    let rec = RecordingClient::new();
    loc_rib.register(rec.clone());
    loc_rib.dispose();
    assert_eq!(loc_rib.client_count(), 0);

    loc_rib.register(rec.clone());
    assert_eq!(loc_rib.client_count(), 0);
    loc_rib.add_path(&pfx("10.0.0.0/8")?, &path(100, "192.0.2.1")?)?;
    assert!(rec.updates().is_empty());
    Ok(())
}

#[test]
fn test_into_adj_rib_out() -> TestResult {
    common::init();
    let attrs = SessionAttrs {
        local_asn: 41981,
        peer_asn: 65001,
        local_ip: addr("127.0.0.1")?,
        peer_ip: addr("192.0.2.2")?,
        ..Default::default()
    };
    let loc_rib = LocRib::new();
    let out = AdjRibOut::with_upstream(
        attrs,
        FilterChain::accept_all(),
        Arc::new(BgpPathCache::new()),
        &loc_rib,
    );
    let rec = RecordingClient::new();
    out.register(rec.clone());
    loc_rib.register(out.clone());

    let sent = |local_pref: u32| -> Result<Path, Box<dyn std::error::Error>> {
        Ok(Path::new_bgp(BgpPath {
            local_pref,
            as_path: AsPath::from_sequence([41981, 65010]),
            next_hop: addr("127.0.0.1")?,
            source: addr("192.0.2.1")?,
            ebgp: true,
            ..Default::default()
        }))
    };

    let p = pfx("198.51.100.0/24")?;
    loc_rib.add_path(&p, &path(100, "192.0.2.1")?)?;
    assert_eq!(out.route_count(), 1);
    assert_eq!(rec.take(), vec![Update::Add(p, sent(100)?)]);

    loc_rib.add_path(&p, &path(200, "192.0.2.1")?)?;
    assert_eq!(
        rec.take(),
        vec![Update::Remove(p, sent(100)?), Update::Add(p, sent(200)?)]
    );

    // the new best path comes from the peer itself
    loc_rib.add_path(&p, &path(300, "192.0.2.2")?)?;
    assert_eq!(rec.take(), vec![Update::Remove(p, sent(200)?)]);
    assert_eq!(out.route_count(), 0);
    assert_eq!(loc_rib.route_count(), 1);
    Ok(())
}
