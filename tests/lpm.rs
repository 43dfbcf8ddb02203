use std::net::Ipv4Addr;
use std::str::FromStr;

use aspa_store::LpmTree;
use inetnum::addr::Prefix;
use rand::Rng;

fn pfx(s: &str) -> Prefix {
    Prefix::from_str(s).expect("well-formed prefix")
}

#[test]
fn longest_match_wins() {
    let mut tree = LpmTree::new();
    tree.insert(pfx("10.0.0.0/8"), "coarse");
    tree.insert(pfx("10.1.0.0/16"), "fine");

    assert_eq!(
        tree.lookup(pfx("10.1.2.3/32")),
        Some((pfx("10.1.0.0/16"), &"fine"))
    );
    assert_eq!(
        tree.lookup(pfx("10.2.2.2/32")),
        Some((pfx("10.0.0.0/8"), &"coarse"))
    );
    assert_eq!(tree.lookup(pfx("11.0.0.0/32")), None);
}

#[test]
fn insertion_order_does_not_matter() {
    let prefixes = [
        "0.0.0.0/0",
        "10.0.0.0/8",
        "10.1.0.0/16",
        "10.1.2.0/24",
        "192.168.0.0/16",
    ];
    let queries = [
        ("10.1.2.3/32", "10.1.2.0/24"),
        ("10.1.3.3/32", "10.1.0.0/16"),
        ("10.9.9.9/32", "10.0.0.0/8"),
        ("192.168.1.1/32", "192.168.0.0/16"),
        ("8.8.8.8/32", "0.0.0.0/0"),
    ];

    // Forward, reverse: the rotation on insert has to produce the same
    // lookups either way.
    for reversed in [false, true] {
        let mut tree = LpmTree::new();
        let mut order: Vec<&str> = prefixes.to_vec();
        if reversed {
            order.reverse();
        }
        for p in order {
            tree.insert(pfx(p), p.to_string());
        }
        assert_eq!(tree.len(), prefixes.len());
        for (query, expected) in queries {
            assert_eq!(
                tree.lookup(pfx(query)).map(|(p, _)| p),
                Some(pfx(expected)),
                "query {}",
                query
            );
        }
    }
}

#[test]
fn exact_lookup_is_not_a_covering_lookup() {
    let mut tree = LpmTree::new();
    tree.insert(pfx("10.0.0.0/8"), 8_u8);
    tree.insert(pfx("10.1.0.0/16"), 16);

    assert_eq!(tree.lookup_exact(pfx("10.1.0.0/16")), Some(&16));
    assert_eq!(tree.lookup_exact(pfx("10.1.0.0/24")), None);
    assert_eq!(tree.lookup_exact(pfx("10.2.0.0/16")), None);
}

#[test]
fn removing_a_covering_prefix_uncovers_the_next_shorter_one() {
    let mut tree = LpmTree::new();
    tree.insert(pfx("10.0.0.0/8"), ());
    tree.insert(pfx("10.1.0.0/16"), ());
    tree.insert(pfx("10.1.2.0/24"), ());

    assert_eq!(tree.remove(pfx("10.1.0.0/16")), Some(()));
    assert_eq!(tree.len(), 2);
    assert_eq!(
        tree.lookup(pfx("10.1.2.3/32")).map(|(p, _)| p),
        Some(pfx("10.1.2.0/24"))
    );
    assert_eq!(
        tree.lookup(pfx("10.1.3.3/32")).map(|(p, _)| p),
        Some(pfx("10.0.0.0/8"))
    );
}

#[test]
fn ipv6_prefixes_work_the_same_way() {
    let mut tree = LpmTree::new();
    tree.insert(pfx("2001:db8::/32"), 32_u8);
    tree.insert(pfx("2001:db8:1::/48"), 48);

    assert_eq!(
        tree.lookup(pfx("2001:db8:1::1/128")),
        Some((pfx("2001:db8:1::/48"), &48))
    );
    assert_eq!(
        tree.lookup(pfx("2001:db8:2::1/128")),
        Some((pfx("2001:db8::/32"), &32))
    );
    assert_eq!(tree.lookup(pfx("2001:db9::1/128")), None);
}

//------------ Randomized comparison against a linear scan -------------------

fn random_prefix(rng: &mut impl Rng) -> Prefix {
    let len = rng.gen_range(0..=32_u8);
    let addr: u32 = rng.gen();
    let masked = if len == 0 {
        0
    } else {
        addr & (u32::MAX << (32 - u32::from(len)))
    };
    Prefix::new(Ipv4Addr::from(masked).into(), len)
        .expect("host bits are masked off")
}

fn covers_v4(prefix: Prefix, addr: u32) -> bool {
    let len = prefix.len();
    let prefix_addr = match prefix.addr() {
        std::net::IpAddr::V4(a) => u32::from(a),
        std::net::IpAddr::V6(_) => return false,
    };
    len == 0 || addr & (u32::MAX << (32 - u32::from(len))) == prefix_addr
}

fn brute_force(
    model: &[(Prefix, usize)],
    addr: u32,
) -> Option<(Prefix, usize)> {
    model
        .iter()
        .filter(|(prefix, _)| covers_v4(*prefix, addr))
        .max_by_key(|(prefix, _)| prefix.len())
        .copied()
}

#[test]
fn lookup_matches_linear_scan() {
    let mut rng = rand::thread_rng();
    let mut tree = LpmTree::new();
    let mut model: Vec<(Prefix, usize)> = Vec::new();

    for payload in 0..200 {
        let prefix = random_prefix(&mut rng);
        let replaced = tree.insert(prefix, payload);
        match model.iter_mut().find(|(p, _)| *p == prefix) {
            Some(entry) => {
                assert_eq!(replaced, Some(entry.1));
                entry.1 = payload;
            }
            None => {
                assert_eq!(replaced, None);
                model.push((prefix, payload));
            }
        }
    }
    assert_eq!(tree.len(), model.len());

    for _ in 0..500 {
        let addr: u32 = rng.gen();
        let query = Prefix::new(Ipv4Addr::from(addr).into(), 32)
            .expect("/32 has no host bits");
        let expected = brute_force(&model, addr);
        assert_eq!(
            tree.lookup(query).map(|(p, v)| (p, *v)),
            expected,
            "query {}",
            query
        );
    }

    // Remove half of the model and verify the tree again.
    while model.len() > 100 {
        let idx = rng.gen_range(0..model.len());
        let (prefix, payload) = model.swap_remove(idx);
        assert_eq!(tree.remove(prefix), Some(payload));
    }
    assert_eq!(tree.len(), model.len());

    for _ in 0..500 {
        let addr: u32 = rng.gen();
        let query = Prefix::new(Ipv4Addr::from(addr).into(), 32)
            .expect("/32 has no host bits");
        let expected = brute_force(&model, addr);
        assert_eq!(
            tree.lookup(query).map(|(p, v)| (p, *v)),
            expected,
            "query {} after removals",
            query
        );
    }
}
