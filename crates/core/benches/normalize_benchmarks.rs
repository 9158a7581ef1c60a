use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use plainjob_core::{Class, KeyOrder, Normalizer, NormalizerConfig, ObjectRef, Value, normalize};

fn order_class() -> Class {
    Class::builder("Order")
        .getter("totalPrice", |this| {
            let qty = this.get("quantity").as_i64().unwrap_or(0);
            let price = this.get("unitPrice").as_i64().unwrap_or(0);
            Value::Int(qty * price)
        })
        .build()
}

/// A customer with `n` orders, each pointing back at the customer.
fn customer_with_orders(class: &Class, n: usize) -> ObjectRef {
    let customer = ObjectRef::new().with("name", "Ada").with("email", "ada@example.com");
    let orders: Vec<Value> = (0..n)
        .map(|i| {
            ObjectRef::instance(class)
                .with("code", i)
                .with("quantity", 2)
                .with("unitPrice", 21)
                .with("customer", customer.clone())
                .into()
        })
        .collect();
    customer.set("orders", orders);
    customer
}

fn bench_plain_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("plain_json");
    for n in [10usize, 100, 1_000] {
        let items: Vec<serde_json::Value> = (0..n)
            .map(|i| serde_json::json!({"sku": format!("SKU-{i}"), "qty": i, "tags": ["a", "b"]}))
            .collect();
        let value = Value::from(serde_json::Value::Array(items));

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &value, |b, value| {
            b.iter(|| normalize(black_box(value)))
        });
    }
    group.finish();
}

fn bench_cyclic_instances(c: &mut Criterion) {
    let class = order_class();
    let mut group = c.benchmark_group("cyclic_instances");
    for n in [10usize, 100, 1_000] {
        let customer = customer_with_orders(&class, n);
        let value = Value::from(customer.clone());

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &value, |b, value| {
            b.iter(|| normalize(black_box(value)))
        });
        customer.clear();
    }
    group.finish();
}

fn bench_sorted_keys(c: &mut Criterion) {
    let class = order_class();
    let customer = customer_with_orders(&class, 100);
    let value = Value::from(customer.clone());
    let normalizer = Normalizer::new(NormalizerConfig::default().with_key_order(KeyOrder::Sorted));

    c.bench_function("sorted_keys_100_orders", |b| {
        b.iter(|| normalizer.normalize(black_box(&value)))
    });
    customer.clear();
}

criterion_group!(benches, bench_plain_json, bench_cyclic_instances, bench_sorted_keys);
criterion_main!(benches);
