#[cfg(test)]
mod tests {
    use crate::repositories::{AvailabilityRepository, CatalogRepository, NewProduct, NewProvider, NewSlot};
    use crate::{in_memory, DbError, Repositories};
    use chrono::NaiveDate;
    use pawtrips_common::models::ProductKind;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Reserve(i64, i64),
        Release(i64, i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..6i64, 0..4i64).prop_map(|(a, d)| Op::Reserve(a, d)),
            (0..6i64, 0..4i64).prop_map(|(a, d)| Op::Release(a, d)),
        ]
    }

    async fn run(max_adults: i64, max_dogs: i64, ops: Vec<Op>) {
        let client = in_memory().await.unwrap();
        let repos = Repositories::new(&client);
        let provider = repos
            .catalog
            .create_provider(NewProvider {
                name: "p".into(),
                email: "p@example.com".into(),
            })
            .await
            .unwrap();
        let product = repos
            .catalog
            .create_product(NewProduct {
                provider_id: provider.id,
                kind: ProductKind::Experience,
                title: "Lake swim".into(),
                description: None,
                location: None,
                price_per_adult_cents: 100,
                price_per_dog_cents: 50,
                currency: "chf".into(),
            })
            .await
            .unwrap();
        let slot = repos
            .availability
            .create_slot(NewSlot {
                product_id: product.id,
                date: NaiveDate::from_ymd_opt(2032, 1, 1).unwrap(),
                start_time: None,
                end_date: None,
                max_adults,
                max_dogs,
            })
            .await
            .unwrap();

        // Reference model of the counters.
        let (mut adults, mut dogs) = (0i64, 0i64);
        for op in ops {
            match op {
                Op::Reserve(a, d) => {
                    let fits = adults + a <= max_adults && dogs + d <= max_dogs;
                    match repos.availability.reserve(&slot.id, a, d).await {
                        Ok(_) => {
                            assert!(fits);
                            adults += a;
                            dogs += d;
                        }
                        Err(DbError::CapacityExceeded { .. }) => assert!(!fits),
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                Op::Release(a, d) => {
                    repos.availability.release(&slot.id, a, d).await.unwrap();
                    adults = (adults - a).max(0);
                    dogs = (dogs - d).max(0);
                }
            }

            let current = repos.availability.find_slot(&slot.id).await.unwrap().unwrap();
            assert!(current.booked_adults >= 0 && current.booked_adults <= current.max_adults);
            assert!(current.booked_dogs >= 0 && current.booked_dogs <= current.max_dogs);
            assert_eq!((current.booked_adults, current.booked_dogs), (adults, dogs));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // Counters stay within 0..=max for any sequence of reserve/release calls
        #[test]
        fn counters_stay_in_bounds(
            max_adults in 0..12i64,
            max_dogs in 0..6i64,
            ops in proptest::collection::vec(op(), 1..25),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(run(max_adults, max_dogs, ops));
        }
    }
}
